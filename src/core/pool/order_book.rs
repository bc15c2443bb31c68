use super::{after_fee_bps, check_fee_bps, checked_reduce, PoolError, PoolResult, SwapMath};
use crate::core::constants::{BPS_DENOMINATOR, ORDER_BOOK_PRICE_SCALE};
use crate::core::types::{amount, CoinType};
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Quote units per base unit, scaled by 1e9.
    #[serde(with = "amount")]
    pub price: BigUint,
    /// Base units resting at this price.
    #[serde(with = "amount")]
    pub quantity: BigUint,
}

impl BookLevel {
    pub fn new(price: impl Into<BigUint>, quantity: impl Into<BigUint>) -> Self {
        Self {
            price: price.into(),
            quantity: quantity.into(),
        }
    }
}

fn one_lot() -> BigUint {
    BigUint::one()
}

/// Central limit order book snapshot. Levels are ordered best price first.
///
/// Fills are tracked as offsets from the top of each side: base sold into
/// the bids, and quote spent on the asks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookPool {
    pub base_coin: CoinType,
    pub quote_coin: CoinType,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    #[serde(with = "amount", default = "one_lot")]
    pub lot_size: BigUint,
    pub taker_fee_bps: u32,
    #[serde(with = "amount", default)]
    pub bids_filled_base: BigUint,
    #[serde(with = "amount", default)]
    pub asks_filled_quote: BigUint,
}

impl OrderBookPool {
    pub fn new(
        base_coin: CoinType,
        quote_coin: CoinType,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        lot_size: BigUint,
        taker_fee_bps: u32,
    ) -> Self {
        Self {
            base_coin,
            quote_coin,
            bids,
            asks,
            lot_size,
            taker_fee_bps,
            bids_filled_base: BigUint::zero(),
            asks_filled_quote: BigUint::zero(),
        }
    }

    fn is_selling_base(&self, coin_in: &CoinType) -> PoolResult<bool> {
        if *coin_in == self.base_coin {
            Ok(true)
        } else if *coin_in == self.quote_coin {
            Ok(false)
        } else {
            Err(PoolError::UnknownCoin(coin_in.clone()))
        }
    }

    fn round_to_lot(&self, base: &BigUint) -> BigUint {
        if self.lot_size.is_zero() {
            return base.clone();
        }
        base - base % &self.lot_size
    }

    // Base sold into the bids must be whole lots
    fn check_lots(&self, base: &BigUint) -> PoolResult<()> {
        if self.round_to_lot(base) != *base {
            return Err(PoolError::OffLot {
                amount: base.clone(),
                lot_size: self.lot_size.clone(),
            });
        }
        Ok(())
    }

    fn price_scale() -> BigUint {
        BigUint::from(ORDER_BOOK_PRICE_SCALE)
    }

    // Quote received for selling `base` into the bids from the top of book
    fn quote_for_base(&self, base: &BigUint) -> PoolResult<BigUint> {
        let scale = Self::price_scale();
        let mut remaining = base.clone();
        let mut quote = BigUint::zero();
        for level in &self.bids {
            if remaining.is_zero() {
                break;
            }
            let filled = if remaining < level.quantity {
                remaining.clone()
            } else {
                level.quantity.clone()
            };
            quote += &filled * &level.price / &scale;
            remaining -= filled;
        }
        if !remaining.is_zero() {
            return Err(PoolError::InsufficientLiquidity);
        }
        Ok(quote)
    }

    // Base received for spending `quote` on the asks from the top of book
    fn base_for_quote(&self, quote: &BigUint) -> PoolResult<BigUint> {
        let scale = Self::price_scale();
        let mut remaining = quote.clone();
        let mut base = BigUint::zero();
        for level in &self.asks {
            if remaining.is_zero() {
                break;
            }
            if level.price.is_zero() {
                return Err(PoolError::InvalidState("ask priced at zero".to_string()));
            }
            let level_cost = (&level.quantity * &level.price + &scale - 1u32) / &scale;
            if remaining >= level_cost {
                base += &level.quantity;
                remaining -= level_cost;
            } else {
                let affordable = self.round_to_lot(&(&remaining * &scale / &level.price));
                base += affordable.min(level.quantity.clone());
                remaining = BigUint::zero();
            }
        }
        if !remaining.is_zero() {
            return Err(PoolError::InsufficientLiquidity);
        }
        Ok(base)
    }

    // Level holding the next unit to be filled on the given side
    fn next_level(&self, selling_base: bool) -> Option<&BookLevel> {
        let scale = Self::price_scale();
        let (levels, filled) = if selling_base {
            (&self.bids, &self.bids_filled_base)
        } else {
            (&self.asks, &self.asks_filled_quote)
        };
        let mut cumulative = BigUint::zero();
        levels.iter().find(|level| {
            cumulative += if selling_base {
                level.quantity.clone()
            } else {
                (&level.quantity * &level.price + &scale - 1u32) / &scale
            };
            cumulative > *filled
        })
    }
}

impl SwapMath for OrderBookPool {
    fn coin_types(&self) -> Vec<CoinType> {
        vec![self.base_coin.clone(), self.quote_coin.clone()]
    }

    fn swap_exact_in(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
    ) -> PoolResult<BigUint> {
        check_fee_bps(self.taker_fee_bps)?;
        let gross_out = if self.is_selling_base(coin_in)? {
            self.check_lots(amount_in)?;
            let before = self.quote_for_base(&self.bids_filled_base)?;
            let after = self.quote_for_base(&(&self.bids_filled_base + amount_in))?;
            checked_reduce(&after, &before)?
        } else {
            let before = self.base_for_quote(&self.asks_filled_quote)?;
            let after = self.base_for_quote(&(&self.asks_filled_quote + amount_in))?;
            checked_reduce(&after, &before)?
        };
        Ok(after_fee_bps(&gross_out, self.taker_fee_bps))
    }

    fn apply_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
        _amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let mut pool = self.clone();
        if self.is_selling_base(coin_in)? {
            self.check_lots(amount_in)?;
            pool.bids_filled_base += amount_in;
        } else {
            pool.asks_filled_quote += amount_in;
        }
        Ok(pool)
    }

    fn revert_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
        _amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let mut pool = self.clone();
        if self.is_selling_base(coin_in)? {
            pool.bids_filled_base = checked_reduce(&self.bids_filled_base, amount_in)?;
        } else {
            pool.asks_filled_quote = checked_reduce(&self.asks_filled_quote, amount_in)?;
        }
        Ok(pool)
    }

    fn closed_form_spot_price(&self, coin_in: &CoinType, _coin_out: &CoinType) -> Option<f64> {
        let selling_base = self.is_selling_base(coin_in).ok()?;
        let level = self.next_level(selling_base)?;
        let price = level.price.to_f64()? / ORDER_BOOK_PRICE_SCALE as f64;
        if price <= 0.0 || self.taker_fee_bps >= BPS_DENOMINATOR {
            return None;
        }
        let fee_factor = 1.0 - self.taker_fee_bps as f64 / BPS_DENOMINATOR as f64;
        let quoted = if selling_base { 1.0 / price } else { price };
        Some(quoted / fee_factor)
    }
}
