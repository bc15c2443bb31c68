use super::{
    after_fee_bps, ceil_div, check_fee_bps, checked_reduce, gross_up_bps, to_f64, PoolError,
    PoolResult, SwapMath,
};
use crate::core::constants::{BPS_DENOMINATOR, FIXED_ONE, ONE};
use crate::core::types::{amount, CoinType};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Liquid staking derivative: stake the native coin for the staked coin at
/// the current exchange rate, or unstake atomically from a reserve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidStakingPool {
    pub native_coin: CoinType,
    pub staked_coin: CoinType,
    /// Staked units minted per native unit, 18-decimal fixed point.
    #[serde(with = "amount")]
    pub exchange_rate: BigUint,
    #[serde(with = "amount")]
    pub min_stake: BigUint,
    pub unstake_fee_bps: u32,
    /// Native coin available for atomic unstaking.
    #[serde(with = "amount")]
    pub atomic_unstake_reserve: BigUint,
}

impl LiquidStakingPool {
    pub fn new(
        native_coin: CoinType,
        staked_coin: CoinType,
        exchange_rate: BigUint,
        min_stake: BigUint,
        unstake_fee_bps: u32,
        atomic_unstake_reserve: BigUint,
    ) -> Self {
        Self {
            native_coin,
            staked_coin,
            exchange_rate,
            min_stake,
            unstake_fee_bps,
            atomic_unstake_reserve,
        }
    }

    fn is_stake(&self, coin_in: &CoinType) -> PoolResult<bool> {
        if *coin_in == self.native_coin {
            Ok(true)
        } else if *coin_in == self.staked_coin {
            Ok(false)
        } else {
            Err(PoolError::UnknownCoin(coin_in.clone()))
        }
    }

    fn rate(&self) -> PoolResult<&BigUint> {
        if self.exchange_rate.is_zero() {
            return Err(PoolError::InvalidState("zero exchange rate".to_string()));
        }
        Ok(&self.exchange_rate)
    }

    fn check_min_stake(&self, amount: &BigUint) -> PoolResult<()> {
        if *amount < self.min_stake {
            return Err(PoolError::BelowMinimumStake {
                amount: amount.clone(),
                minimum: self.min_stake.clone(),
            });
        }
        Ok(())
    }
}

impl SwapMath for LiquidStakingPool {
    fn coin_types(&self) -> Vec<CoinType> {
        vec![self.native_coin.clone(), self.staked_coin.clone()]
    }

    fn swap_exact_in(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
    ) -> PoolResult<BigUint> {
        check_fee_bps(self.unstake_fee_bps)?;
        let rate = self.rate()?;
        if self.is_stake(coin_in)? {
            self.check_min_stake(amount_in)?;
            return Ok(amount_in * rate / ONE());
        }

        let gross = amount_in * ONE() / rate;
        let amount_out = after_fee_bps(&gross, self.unstake_fee_bps);
        if amount_out > self.atomic_unstake_reserve {
            return Err(PoolError::InsufficientLiquidity);
        }
        Ok(amount_out)
    }

    fn swap_exact_out(
        &self,
        coin_in: &CoinType,
        _coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<BigUint> {
        check_fee_bps(self.unstake_fee_bps)?;
        let rate = self.rate()?;
        if self.is_stake(coin_in)? {
            let amount_in = ceil_div(&(amount_out * ONE()), rate)?;
            self.check_min_stake(&amount_in)?;
            return Ok(amount_in);
        }

        if *amount_out > self.atomic_unstake_reserve {
            return Err(PoolError::InsufficientLiquidity);
        }
        let gross = gross_up_bps(amount_out, self.unstake_fee_bps)?;
        ceil_div(&(gross * rate), &ONE())
    }

    fn apply_trade(
        &self,
        coin_in: &CoinType,
        _amount_in: &BigUint,
        _coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let mut pool = self.clone();
        if !self.is_stake(coin_in)? {
            pool.atomic_unstake_reserve = checked_reduce(&self.atomic_unstake_reserve, amount_out)?;
        }
        Ok(pool)
    }

    fn revert_trade(
        &self,
        coin_in: &CoinType,
        _amount_in: &BigUint,
        _coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let mut pool = self.clone();
        if !self.is_stake(coin_in)? {
            pool.atomic_unstake_reserve += amount_out;
        }
        Ok(pool)
    }

    fn closed_form_spot_price(&self, coin_in: &CoinType, _coin_out: &CoinType) -> Option<f64> {
        let rate = to_f64(self.rate().ok()?) / FIXED_ONE as f64;
        if self.is_stake(coin_in).ok()? {
            return Some(1.0 / rate);
        }
        if self.unstake_fee_bps >= BPS_DENOMINATOR {
            return None;
        }
        let fee_factor = 1.0 - self.unstake_fee_bps as f64 / BPS_DENOMINATOR as f64;
        Some(rate / fee_factor)
    }
}
