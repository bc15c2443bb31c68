use super::{ceil_div, check_fee_bps, checked_reduce, ratio_f64, PoolError, PoolResult, SwapMath};
use crate::core::constants::BPS_DENOMINATOR;
use crate::core::types::{amount, CoinType};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Two-coin `x * y = k` pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantProductPool {
    pub coin_x: CoinType,
    pub coin_y: CoinType,
    #[serde(with = "amount")]
    pub reserve_x: BigUint,
    #[serde(with = "amount")]
    pub reserve_y: BigUint,
    pub fee_bps: u32,
}

impl ConstantProductPool {
    pub fn new(
        coin_x: CoinType,
        coin_y: CoinType,
        reserve_x: BigUint,
        reserve_y: BigUint,
        fee_bps: u32,
    ) -> Self {
        Self {
            coin_x,
            coin_y,
            reserve_x,
            reserve_y,
            fee_bps,
        }
    }

    // (reserve_in, reserve_out)
    fn reserves(&self, coin_in: &CoinType) -> PoolResult<(&BigUint, &BigUint)> {
        if *coin_in == self.coin_x {
            Ok((&self.reserve_x, &self.reserve_y))
        } else if *coin_in == self.coin_y {
            Ok((&self.reserve_y, &self.reserve_x))
        } else {
            Err(PoolError::UnknownCoin(coin_in.clone()))
        }
    }

    fn with_reserves(&self, coin_in: &CoinType, reserve_in: BigUint, reserve_out: BigUint) -> Self {
        let mut pool = self.clone();
        if *coin_in == self.coin_x {
            pool.reserve_x = reserve_in;
            pool.reserve_y = reserve_out;
        } else {
            pool.reserve_y = reserve_in;
            pool.reserve_x = reserve_out;
        }
        pool
    }
}

impl SwapMath for ConstantProductPool {
    fn coin_types(&self) -> Vec<CoinType> {
        vec![self.coin_x.clone(), self.coin_y.clone()]
    }

    fn swap_exact_in(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
    ) -> PoolResult<BigUint> {
        check_fee_bps(self.fee_bps)?;
        let (reserve_in, reserve_out) = self.reserves(coin_in)?;

        // amount_in * (1 - fee)
        let amount_in_with_fee = amount_in * (BPS_DENOMINATOR - self.fee_bps);
        let numerator = &amount_in_with_fee * reserve_out;
        let denominator = reserve_in * BPS_DENOMINATOR + &amount_in_with_fee;

        if denominator.is_zero() {
            return Err(PoolError::InsufficientLiquidity);
        }
        Ok(numerator / denominator)
    }

    fn swap_exact_out(
        &self,
        coin_in: &CoinType,
        _coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<BigUint> {
        check_fee_bps(self.fee_bps)?;
        let (reserve_in, reserve_out) = self.reserves(coin_in)?;

        if amount_out >= reserve_out {
            return Err(PoolError::InsufficientLiquidity);
        }
        let numerator = amount_out * reserve_in * BPS_DENOMINATOR;
        let denominator = (reserve_out - amount_out) * (BPS_DENOMINATOR - self.fee_bps);

        ceil_div(&numerator, &denominator)
    }

    fn apply_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let (reserve_in, reserve_out) = self.reserves(coin_in)?;
        Ok(self.with_reserves(
            coin_in,
            reserve_in + amount_in,
            checked_reduce(reserve_out, amount_out)?,
        ))
    }

    fn revert_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let (reserve_in, reserve_out) = self.reserves(coin_in)?;
        Ok(self.with_reserves(
            coin_in,
            checked_reduce(reserve_in, amount_in)?,
            reserve_out + amount_out,
        ))
    }

    fn closed_form_spot_price(&self, coin_in: &CoinType, _coin_out: &CoinType) -> Option<f64> {
        let (reserve_in, reserve_out) = self.reserves(coin_in).ok()?;
        if reserve_in.is_zero() || reserve_out.is_zero() || self.fee_bps >= BPS_DENOMINATOR {
            return None;
        }
        let fee_factor = 1.0 - self.fee_bps as f64 / BPS_DENOMINATOR as f64;
        Some(ratio_f64(reserve_in, reserve_out) / fee_factor)
    }
}
