use super::{
    after_fee_bps, ceil_div, check_fee_bps, checked_reduce, gross_up_bps, PoolError, PoolResult,
    SwapMath,
};
use crate::core::constants::STABLE_MAX_ITERATIONS;
use crate::core::types::{amount, CoinType};
use num_bigint::BigUint;
use num_traits::{CheckedSub, One, Zero};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableCoin {
    pub coin_type: CoinType,
    #[serde(with = "amount")]
    pub balance: BigUint,
    /// Multiplier lifting the raw balance to the pool's common precision.
    #[serde(with = "amount")]
    pub scale: BigUint,
}

impl StableCoin {
    pub fn new(coin_type: CoinType, balance: BigUint, scale: BigUint) -> Self {
        Self {
            coin_type,
            balance,
            scale,
        }
    }
}

/// Curve-style stableswap pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StablePool {
    pub coins: Vec<StableCoin>,
    pub amplification: u64,
    pub fee_bps: u32,
}

impl StablePool {
    pub fn new(coins: Vec<StableCoin>, amplification: u64, fee_bps: u32) -> Self {
        Self {
            coins,
            amplification,
            fee_bps,
        }
    }

    fn index_of(&self, coin: &CoinType) -> PoolResult<usize> {
        self.coins
            .iter()
            .position(|c| c.coin_type == *coin)
            .ok_or_else(|| PoolError::UnknownCoin(coin.clone()))
    }

    // Balances lifted to common precision
    fn xp(&self) -> PoolResult<Vec<BigUint>> {
        if self.coins.len() < 2 {
            return Err(PoolError::InvalidState(
                "stable pool needs at least two coins".to_string(),
            ));
        }
        self.coins
            .iter()
            .map(|c| {
                if c.balance.is_zero() {
                    Err(PoolError::InsufficientLiquidity)
                } else if c.scale.is_zero() {
                    Err(PoolError::InvalidState(format!(
                        "{} has a zero scale",
                        c.coin_type
                    )))
                } else {
                    Ok(&c.balance * &c.scale)
                }
            })
            .collect()
    }

    fn ann(&self) -> PoolResult<BigUint> {
        if self.amplification == 0 {
            return Err(PoolError::InvalidState(
                "amplification must be positive".to_string(),
            ));
        }
        Ok(BigUint::from(self.amplification) * self.coins.len())
    }

    fn get_d(&self, xp: &[BigUint]) -> PoolResult<BigUint> {
        let n = xp.len();
        let sum: BigUint = xp.iter().sum();
        if sum.is_zero() {
            return Ok(BigUint::zero());
        }
        let ann = self.ann()?;

        let mut d = sum.clone();
        for _ in 0..STABLE_MAX_ITERATIONS {
            let mut d_p = d.clone();
            for x in xp {
                d_p = d_p * &d / (x * n);
            }
            let d_prev = d.clone();
            let numerator = (&ann * &sum + &d_p * n) * &d;
            let denominator = (&ann - 1u32) * &d + &d_p * (n + 1);
            d = numerator / denominator;

            if abs_diff(&d, &d_prev) <= BigUint::one() {
                return Ok(d);
            }
        }
        Err(PoolError::NoConvergence)
    }

    // New balance of coin `j` once coin `i` holds `x`, keeping `d` fixed
    fn get_y(&self, i: usize, j: usize, x: &BigUint, xp: &[BigUint], d: &BigUint) -> PoolResult<BigUint> {
        let n = xp.len();
        let ann = self.ann()?;

        let mut c = d.clone();
        let mut s = BigUint::zero();
        for (k, balance) in xp.iter().enumerate() {
            let value = if k == i {
                x
            } else if k != j {
                balance
            } else {
                continue;
            };
            if value.is_zero() {
                return Err(PoolError::InsufficientLiquidity);
            }
            s += value;
            c = c * d / (value * n);
        }
        c = c * d / (&ann * n);
        let b = s + d / &ann;

        let mut y = d.clone();
        for _ in 0..STABLE_MAX_ITERATIONS {
            let y_prev = y.clone();
            let denominator = (&y * 2u32 + &b)
                .checked_sub(d)
                .filter(|den| !den.is_zero())
                .ok_or(PoolError::NoConvergence)?;
            y = (&y * &y + &c) / denominator;

            if abs_diff(&y, &y_prev) <= BigUint::one() {
                return Ok(y);
            }
        }
        Err(PoolError::NoConvergence)
    }
}

fn abs_diff(a: &BigUint, b: &BigUint) -> BigUint {
    if a > b {
        a - b
    } else {
        b - a
    }
}

impl SwapMath for StablePool {
    fn coin_types(&self) -> Vec<CoinType> {
        self.coins.iter().map(|c| c.coin_type.clone()).collect()
    }

    fn swap_exact_in(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
    ) -> PoolResult<BigUint> {
        check_fee_bps(self.fee_bps)?;
        let i = self.index_of(coin_in)?;
        let j = self.index_of(coin_out)?;
        let xp = self.xp()?;
        let d = self.get_d(&xp)?;

        let x = &xp[i] + amount_in * &self.coins[i].scale;
        let y = self.get_y(i, j, &x, &xp, &d)?;
        let dy = (&xp[j])
            .checked_sub(&(y + 1u32))
            .ok_or(PoolError::InsufficientLiquidity)?
            / &self.coins[j].scale;

        Ok(after_fee_bps(&dy, self.fee_bps))
    }

    fn swap_exact_out(
        &self,
        coin_in: &CoinType,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<BigUint> {
        check_fee_bps(self.fee_bps)?;
        let i = self.index_of(coin_in)?;
        let j = self.index_of(coin_out)?;
        let xp = self.xp()?;
        let d = self.get_d(&xp)?;

        let gross_out = gross_up_bps(amount_out, self.fee_bps)?;
        let lifted_out = (gross_out + 1u32) * &self.coins[j].scale;
        if lifted_out >= xp[j] {
            return Err(PoolError::InsufficientLiquidity);
        }
        let y = &xp[j] - lifted_out;
        let x = self.get_y(j, i, &y, &xp, &d)?;
        let dx = x
            .checked_sub(&xp[i])
            .ok_or(PoolError::InsufficientLiquidity)?;

        ceil_div(&(dx + 1u32), &self.coins[i].scale)
    }

    fn apply_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let i = self.index_of(coin_in)?;
        let j = self.index_of(coin_out)?;
        let mut pool = self.clone();
        pool.coins[i].balance += amount_in;
        pool.coins[j].balance = checked_reduce(&self.coins[j].balance, amount_out)?;
        Ok(pool)
    }

    fn revert_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        coin_out: &CoinType,
        amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let i = self.index_of(coin_in)?;
        let j = self.index_of(coin_out)?;
        let mut pool = self.clone();
        pool.coins[i].balance = checked_reduce(&self.coins[i].balance, amount_in)?;
        pool.coins[j].balance += amount_out;
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(name: &str) -> CoinType {
        CoinType::new(name)
    }

    // 6-decimal and 9-decimal coins lifted to 18 decimals
    fn pool(balance_a: u64, balance_b: u64) -> StablePool {
        StablePool::new(
            vec![
                StableCoin::new(
                    coin("0x1::usdc::USDC"),
                    BigUint::from(balance_a) * 1_000u32,
                    BigUint::from(10u64.pow(12)),
                ),
                StableCoin::new(
                    coin("0x1::usdt::USDT"),
                    BigUint::from(balance_b) * 1_000_000u32,
                    BigUint::from(10u64.pow(9)),
                ),
            ],
            200,
            4,
        )
    }

    #[test]
    fn balanced_swap_is_near_parity() {
        let pool = pool(1_000_000_000, 1_000_000_000);
        // 1000 units of a 6-decimal coin
        let amount_in = BigUint::from(1_000_000_000u64);
        let out = pool
            .swap_exact_in(&coin("0x1::usdc::USDC"), &amount_in, &coin("0x1::usdt::USDT"))
            .unwrap();
        // roughly 1000 units of a 9-decimal coin minus the 4 bps fee
        let expected = 999_600_000_000u64;
        let out = out.to_string().parse::<u64>().unwrap();
        assert!(out <= expected && out > expected - 10_000_000, "out was {out}");
    }

    #[test]
    fn imbalanced_pool_pays_less() {
        let balanced = pool(1_000_000_000, 1_000_000_000);
        let skewed = pool(1_900_000_000, 100_000_000);
        let amount_in = BigUint::from(10_000_000_000u64);
        let a = coin("0x1::usdc::USDC");
        let b = coin("0x1::usdt::USDT");
        let balanced_out = balanced.swap_exact_in(&a, &amount_in, &b).unwrap();
        let skewed_out = skewed.swap_exact_in(&a, &amount_in, &b).unwrap();
        assert!(skewed_out < balanced_out);
    }

    #[test]
    fn exact_out_covers_request() {
        let pool = pool(1_000_000_000, 1_000_000_000);
        let a = coin("0x1::usdc::USDC");
        let b = coin("0x1::usdt::USDT");
        let wanted = BigUint::from(500_000_000_000u64);
        let needed = pool.swap_exact_out(&a, &b, &wanted).unwrap();
        assert!(pool.swap_exact_in(&a, &needed, &b).unwrap() >= wanted);
    }

    #[test]
    fn empty_coin_is_insufficient_liquidity() {
        let mut pool = pool(1_000, 1_000);
        pool.coins[1].balance = BigUint::zero();
        let err = pool
            .swap_exact_in(&coin("0x1::usdc::USDC"), &BigUint::from(10u32), &coin("0x1::usdt::USDT"))
            .unwrap_err();
        assert_eq!(err, PoolError::InsufficientLiquidity);
    }

    #[test]
    fn apply_then_revert_is_identity() {
        let pool = pool(1_000_000, 1_000_000);
        let a = coin("0x1::usdc::USDC");
        let b = coin("0x1::usdt::USDT");
        let amount_in = BigUint::from(50_000u32);
        let amount_out = pool.swap_exact_in(&a, &amount_in, &b).unwrap();
        let traded = pool.apply_trade(&a, &amount_in, &b, &amount_out).unwrap();
        assert_eq!(traded.revert_trade(&a, &amount_in, &b, &amount_out).unwrap(), pool);
    }
}
