mod constant_product;
pub mod fixed_point;
mod order_book;
mod sampled;
mod stable;
mod staking;
mod weighted;

pub use constant_product::ConstantProductPool;
pub use order_book::{BookLevel, OrderBookPool};
pub use sampled::{Sample, SampleCurve, SampledPool};
pub use stable::{StableCoin, StablePool};
pub use staking::LiquidStakingPool;
pub use weighted::{WeightedCoin, WeightedPool};

use super::constants::{BPS_DENOMINATOR, SPOT_PRICE_PROBE_ATTEMPTS};
use super::types::CoinType;
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    #[error("amount {amount} is below the minimum stake of {minimum}")]
    BelowMinimumStake { amount: BigUint, minimum: BigUint },
    #[error("{0} is not supported by this pool")]
    NotImplemented(&'static str),
    #[error("coin {0} is not traded by this pool")]
    UnknownCoin(CoinType),
    #[error("stable invariant did not converge")]
    NoConvergence,
    #[error("trade amount rounds to zero")]
    ZeroAmount,
    #[error("amount {amount} is not a whole number of lots of {lot_size}")]
    OffLot { amount: BigUint, lot_size: BigUint },
    #[error("invalid pool state: {0}")]
    InvalidState(String),
}

pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Swap math every protocol variant provides. Coin validation happens in
/// [`Pool`] before any of these are called.
pub(crate) trait SwapMath: Sized {
    fn coin_types(&self) -> Vec<CoinType>;

    fn swap_exact_in(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
    ) -> PoolResult<BigUint>;

    fn swap_exact_out(
        &self,
        _coin_in: &CoinType,
        _coin_out: &CoinType,
        _amount_out: &BigUint,
    ) -> PoolResult<BigUint> {
        Err(PoolError::NotImplemented("exact output quoting"))
    }

    fn apply_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self>;

    fn revert_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self>;

    /// `coin_in` units per `coin_out` unit, when the curve has a closed form.
    fn closed_form_spot_price(&self, _coin_in: &CoinType, _coin_out: &CoinType) -> Option<f64> {
        None
    }
}

/// Simulated state of one pool, tagged by protocol math.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pool {
    ConstantProduct(ConstantProductPool),
    Weighted(WeightedPool),
    Stable(StablePool),
    Sampled(SampledPool),
    OrderBook(OrderBookPool),
    LiquidStaking(LiquidStakingPool),
}

macro_rules! dispatch {
    ($pool:expr, $inner:ident => $body:expr) => {
        match $pool {
            Pool::ConstantProduct($inner) => $body,
            Pool::Weighted($inner) => $body,
            Pool::Stable($inner) => $body,
            Pool::Sampled($inner) => $body,
            Pool::OrderBook($inner) => $body,
            Pool::LiquidStaking($inner) => $body,
        }
    };
}

macro_rules! rewrap {
    ($pool:expr, $inner:ident => $body:expr) => {
        match $pool {
            Pool::ConstantProduct($inner) => Pool::ConstantProduct($body?),
            Pool::Weighted($inner) => Pool::Weighted($body?),
            Pool::Stable($inner) => Pool::Stable($body?),
            Pool::Sampled($inner) => Pool::Sampled($body?),
            Pool::OrderBook($inner) => Pool::OrderBook($body?),
            Pool::LiquidStaking($inner) => Pool::LiquidStaking($body?),
        }
    };
}

impl Pool {
    pub fn coin_types(&self) -> Vec<CoinType> {
        dispatch!(self, pool => pool.coin_types())
    }

    /// Pools priced from an off-ledger dry run or an order book cannot be
    /// chained behind another hop.
    pub fn requires_single_hop(&self) -> bool {
        matches!(self, Pool::Sampled(_) | Pool::OrderBook(_))
    }

    pub fn default_execution_cost(&self) -> u64 {
        match self {
            Pool::ConstantProduct(_) => 1,
            Pool::Weighted(_) | Pool::LiquidStaking(_) => 2,
            Pool::Stable(_) => 3,
            Pool::Sampled(_) => 4,
            Pool::OrderBook(_) => 5,
        }
    }

    pub fn trade_amount_out(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
    ) -> PoolResult<BigUint> {
        self.check_pair(coin_in, coin_out)?;
        if amount_in.is_zero() {
            return Err(PoolError::ZeroAmount);
        }
        let amount_out = dispatch!(self, pool => pool.swap_exact_in(coin_in, amount_in, coin_out))?;
        if amount_out.is_zero() {
            return Err(PoolError::ZeroAmount);
        }
        Ok(amount_out)
    }

    /// Input needed to receive exactly `amount_out`, rounded against the taker.
    pub fn trade_amount_in(
        &self,
        coin_in: &CoinType,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<BigUint> {
        self.check_pair(coin_in, coin_out)?;
        if amount_out.is_zero() {
            return Err(PoolError::ZeroAmount);
        }
        dispatch!(self, pool => pool.swap_exact_out(coin_in, coin_out, amount_out))
    }

    pub fn apply_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Pool> {
        self.check_pair(coin_in, coin_out)?;
        Ok(rewrap!(self, pool => pool.apply_trade(coin_in, amount_in, coin_out, amount_out)))
    }

    /// Undo a previous [`Pool::apply_trade`] with the same arguments.
    pub fn revert_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Pool> {
        self.check_pair(coin_in, coin_out)?;
        Ok(rewrap!(self, pool => pool.revert_trade(coin_in, amount_in, coin_out, amount_out)))
    }

    /// Units of `coin_in` paid per unit of `coin_out` for a marginal trade.
    ///
    /// Curves without a closed form are probed with a small trade, growing
    /// the probe tenfold whenever it rounds to nothing.
    pub fn spot_price(
        &self,
        coin_in: &CoinType,
        coin_out: &CoinType,
        probe_amount: &BigUint,
    ) -> PoolResult<f64> {
        self.check_pair(coin_in, coin_out)?;
        if let Some(price) = dispatch!(self, pool => pool.closed_form_spot_price(coin_in, coin_out)) {
            return Ok(price);
        }

        let mut probe = if probe_amount.is_zero() {
            BigUint::one()
        } else {
            probe_amount.clone()
        };
        for _ in 0..SPOT_PRICE_PROBE_ATTEMPTS {
            if let Ok(amount_out) = self.trade_amount_out(coin_in, &probe, coin_out) {
                return Ok(ratio_f64(&probe, &amount_out));
            }
            probe *= 10u32;
        }
        Err(PoolError::InsufficientLiquidity)
    }

    fn check_pair(&self, coin_in: &CoinType, coin_out: &CoinType) -> PoolResult<()> {
        let coins = self.coin_types();
        for coin in [coin_in, coin_out] {
            if !coins.contains(coin) {
                return Err(PoolError::UnknownCoin(coin.clone()));
            }
        }
        if coin_in == coin_out {
            return Err(PoolError::InvalidState(format!(
                "cannot swap {coin_in} for itself"
            )));
        }
        Ok(())
    }
}

pub fn to_f64(value: &BigUint) -> f64 {
    value.to_f64().unwrap_or(f64::INFINITY)
}

pub fn ratio_f64(numerator: &BigUint, denominator: &BigUint) -> f64 {
    if denominator.is_zero() {
        return f64::INFINITY;
    }
    to_f64(numerator) / to_f64(denominator)
}

pub(crate) fn ceil_div(numerator: &BigUint, denominator: &BigUint) -> PoolResult<BigUint> {
    if denominator.is_zero() {
        return Err(PoolError::InvalidState("division by zero".to_string()));
    }
    Ok((numerator + denominator - BigUint::one()) / denominator)
}

/// Portion of `amount` kept after a basis point fee, rounded down.
pub(crate) fn after_fee_bps(amount: &BigUint, fee_bps: u32) -> BigUint {
    let fee = amount * fee_bps / BPS_DENOMINATOR;
    amount - fee
}

/// Smallest gross amount whose post-fee value covers `net`.
pub(crate) fn gross_up_bps(net: &BigUint, fee_bps: u32) -> PoolResult<BigUint> {
    ceil_div(
        &(net * BPS_DENOMINATOR),
        &BigUint::from(BPS_DENOMINATOR - fee_bps),
    )
}

pub(crate) fn check_fee_bps(fee_bps: u32) -> PoolResult<()> {
    if fee_bps >= BPS_DENOMINATOR {
        return Err(PoolError::InvalidState(format!(
            "fee of {fee_bps} bps leaves nothing to trade"
        )));
    }
    Ok(())
}

pub(crate) fn checked_reduce(value: &BigUint, by: &BigUint) -> PoolResult<BigUint> {
    if by > value {
        return Err(PoolError::InvalidState(format!(
            "cannot remove {by} from a balance of {value}"
        )));
    }
    Ok(value - by)
}
