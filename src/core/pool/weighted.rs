use super::fixed_point::{complement, div_down, div_up, mul_down, mul_up, pow_down, pow_up};
use super::{checked_reduce, ratio_f64, to_f64, PoolError, PoolResult, SwapMath};
use crate::core::constants::{FIXED_ONE, ONE};
use crate::core::types::{amount, CoinType};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

const MIN_COINS: usize = 2;
const MAX_COINS: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedCoin {
    pub coin_type: CoinType,
    #[serde(with = "amount")]
    pub balance: BigUint,
    /// Normalized weight, 18-decimal fixed point.
    #[serde(with = "amount")]
    pub weight: BigUint,
    #[serde(with = "amount")]
    pub fee_in: BigUint,
    #[serde(with = "amount")]
    pub fee_out: BigUint,
}

impl WeightedCoin {
    pub fn new(coin_type: CoinType, balance: BigUint, weight: BigUint) -> Self {
        Self {
            coin_type,
            balance,
            weight,
            fee_in: BigUint::zero(),
            fee_out: BigUint::zero(),
        }
    }

    pub fn with_fees(mut self, fee_in: BigUint, fee_out: BigUint) -> Self {
        self.fee_in = fee_in;
        self.fee_out = fee_out;
        self
    }
}

/// Balancer-style weighted pool whose LP coin can itself be traded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedPool {
    pub coins: Vec<WeightedCoin>,
    pub lp_coin_type: CoinType,
    #[serde(with = "amount")]
    pub lp_supply: BigUint,
}

enum Trade {
    Swap { index_in: usize, index_out: usize },
    Deposit { index_in: usize },
    Withdraw { index_out: usize },
}

impl WeightedPool {
    pub fn new(coins: Vec<WeightedCoin>, lp_coin_type: CoinType, lp_supply: BigUint) -> Self {
        Self {
            coins,
            lp_coin_type,
            lp_supply,
        }
    }

    fn index_of(&self, coin: &CoinType) -> PoolResult<usize> {
        self.coins
            .iter()
            .position(|c| c.coin_type == *coin)
            .ok_or_else(|| PoolError::UnknownCoin(coin.clone()))
    }

    fn classify(&self, coin_in: &CoinType, coin_out: &CoinType) -> PoolResult<Trade> {
        if !(MIN_COINS..=MAX_COINS).contains(&self.coins.len()) {
            return Err(PoolError::InvalidState(format!(
                "weighted pool holds {} coins",
                self.coins.len()
            )));
        }
        if *coin_out == self.lp_coin_type {
            Ok(Trade::Deposit {
                index_in: self.index_of(coin_in)?,
            })
        } else if *coin_in == self.lp_coin_type {
            Ok(Trade::Withdraw {
                index_out: self.index_of(coin_out)?,
            })
        } else {
            Ok(Trade::Swap {
                index_in: self.index_of(coin_in)?,
                index_out: self.index_of(coin_out)?,
            })
        }
    }

    fn coin(&self, index: usize) -> PoolResult<&WeightedCoin> {
        let coin = &self.coins[index];
        if coin.balance.is_zero() || coin.weight.is_zero() {
            return Err(PoolError::InsufficientLiquidity);
        }
        Ok(coin)
    }

    fn lp_supply(&self) -> PoolResult<&BigUint> {
        if self.lp_supply.is_zero() {
            return Err(PoolError::InsufficientLiquidity);
        }
        Ok(&self.lp_supply)
    }

    // Fee charged only on the part of a single sided join/exit that is
    // not already in proportion to the pool
    fn taxable_fee(weight: &BigUint, fee: &BigUint) -> BigUint {
        mul_up(&complement(weight), fee)
    }
}

impl SwapMath for WeightedPool {
    fn coin_types(&self) -> Vec<CoinType> {
        self.coins
            .iter()
            .map(|c| c.coin_type.clone())
            .chain(std::iter::once(self.lp_coin_type.clone()))
            .collect()
    }

    fn swap_exact_in(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
    ) -> PoolResult<BigUint> {
        match self.classify(coin_in, coin_out)? {
            Trade::Swap {
                index_in,
                index_out,
            } => {
                let c_in = self.coin(index_in)?;
                let c_out = self.coin(index_out)?;

                let net_in = mul_down(amount_in, &complement(&c_in.fee_in));
                let base = div_up(&c_in.balance, &(&c_in.balance + &net_in))?;
                let exponent = div_down(&c_in.weight, &c_out.weight)?;
                let power = pow_up(&base, &exponent)?;
                let gross_out = mul_down(&c_out.balance, &complement(&power));

                Ok(mul_down(&gross_out, &complement(&c_out.fee_out)))
            }
            Trade::Deposit { index_in } => {
                let c_in = self.coin(index_in)?;
                let supply = self.lp_supply()?;

                let fee = Self::taxable_fee(&c_in.weight, &c_in.fee_in);
                let net_in = mul_down(amount_in, &complement(&fee));
                let ratio = div_down(&(&c_in.balance + &net_in), &c_in.balance)?;
                let power = pow_down(&ratio, &c_in.weight)?;
                let one = ONE();
                if power <= one {
                    return Ok(BigUint::zero());
                }
                Ok(mul_down(supply, &(power - one)))
            }
            Trade::Withdraw { index_out } => {
                let c_out = self.coin(index_out)?;
                let supply = self.lp_supply()?;
                if amount_in >= supply {
                    return Err(PoolError::InsufficientLiquidity);
                }

                let ratio = div_up(&(supply - amount_in), supply)?;
                let exponent = div_down(&ONE(), &c_out.weight)?;
                let power = pow_up(&ratio, &exponent)?;
                let gross_out = mul_down(&c_out.balance, &complement(&power));
                let fee = Self::taxable_fee(&c_out.weight, &c_out.fee_out);

                Ok(mul_down(&gross_out, &complement(&fee)))
            }
        }
    }

    fn swap_exact_out(
        &self,
        coin_in: &CoinType,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<BigUint> {
        match self.classify(coin_in, coin_out)? {
            Trade::Swap {
                index_in,
                index_out,
            } => {
                let c_in = self.coin(index_in)?;
                let c_out = self.coin(index_out)?;

                let gross_out = div_up(amount_out, &complement(&c_out.fee_out))?;
                if gross_out >= c_out.balance {
                    return Err(PoolError::InsufficientLiquidity);
                }
                let base = div_up(&c_out.balance, &(&c_out.balance - &gross_out))?;
                let exponent = div_up(&c_out.weight, &c_in.weight)?;
                let power = pow_up(&base, &exponent)?;
                let net_in = mul_up(&c_in.balance, &(power - ONE()));

                div_up(&net_in, &complement(&c_in.fee_in))
            }
            Trade::Deposit { index_in } => {
                let c_in = self.coin(index_in)?;
                let supply = self.lp_supply()?;

                let ratio = div_up(&(supply + amount_out), supply)?;
                let exponent = div_up(&ONE(), &c_in.weight)?;
                let power = pow_up(&ratio, &exponent)?;
                let net_in = mul_up(&c_in.balance, &(power - ONE()));
                let fee = Self::taxable_fee(&c_in.weight, &c_in.fee_in);

                div_up(&net_in, &complement(&fee))
            }
            Trade::Withdraw { index_out } => {
                let c_out = self.coin(index_out)?;
                let supply = self.lp_supply()?;

                let fee = Self::taxable_fee(&c_out.weight, &c_out.fee_out);
                let gross_out = div_up(amount_out, &complement(&fee))?;
                if gross_out >= c_out.balance {
                    return Err(PoolError::InsufficientLiquidity);
                }
                let ratio = div_down(&(&c_out.balance - &gross_out), &c_out.balance)?;
                let power = pow_down(&ratio, &c_out.weight)?;

                Ok(mul_up(supply, &complement(&power)))
            }
        }
    }

    fn apply_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let mut pool = self.clone();
        match self.classify(coin_in, coin_out)? {
            Trade::Swap {
                index_in,
                index_out,
            } => {
                pool.coins[index_in].balance += amount_in;
                pool.coins[index_out].balance =
                    checked_reduce(&self.coins[index_out].balance, amount_out)?;
            }
            Trade::Deposit { index_in } => {
                pool.coins[index_in].balance += amount_in;
                pool.lp_supply += amount_out;
            }
            Trade::Withdraw { index_out } => {
                pool.lp_supply = checked_reduce(&self.lp_supply, amount_in)?;
                pool.coins[index_out].balance =
                    checked_reduce(&self.coins[index_out].balance, amount_out)?;
            }
        }
        Ok(pool)
    }

    fn revert_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let mut pool = self.clone();
        match self.classify(coin_in, coin_out)? {
            Trade::Swap {
                index_in,
                index_out,
            } => {
                pool.coins[index_in].balance =
                    checked_reduce(&self.coins[index_in].balance, amount_in)?;
                pool.coins[index_out].balance += amount_out;
            }
            Trade::Deposit { index_in } => {
                pool.coins[index_in].balance =
                    checked_reduce(&self.coins[index_in].balance, amount_in)?;
                pool.lp_supply = checked_reduce(&self.lp_supply, amount_out)?;
            }
            Trade::Withdraw { index_out } => {
                pool.lp_supply += amount_in;
                pool.coins[index_out].balance += amount_out;
            }
        }
        Ok(pool)
    }

    fn closed_form_spot_price(&self, coin_in: &CoinType, coin_out: &CoinType) -> Option<f64> {
        let Ok(Trade::Swap {
            index_in,
            index_out,
        }) = self.classify(coin_in, coin_out)
        else {
            return None;
        };
        let c_in = self.coin(index_in).ok()?;
        let c_out = self.coin(index_out).ok()?;

        let one = FIXED_ONE as f64;
        let weighted_in = ratio_f64(&c_in.balance, &c_in.weight);
        let weighted_out = ratio_f64(&c_out.balance, &c_out.weight);
        let fee_factor =
            (1.0 - to_f64(&c_in.fee_in) / one) * (1.0 - to_f64(&c_out.fee_out) / one);
        if fee_factor <= 0.0 {
            return None;
        }
        Some(weighted_in / weighted_out / fee_factor)
    }
}
