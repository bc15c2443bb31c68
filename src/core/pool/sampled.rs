use super::{checked_reduce, PoolError, PoolResult, SwapMath};
use crate::core::types::{amount, CoinType};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// One dry-run quote: trading `amount_in` from an untouched pool yields
/// `amount_out`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(with = "amount")]
    pub amount_in: BigUint,
    #[serde(with = "amount")]
    pub amount_out: BigUint,
}

impl Sample {
    pub fn new(amount_in: impl Into<BigUint>, amount_out: impl Into<BigUint>) -> Self {
        Self {
            amount_in: amount_in.into(),
            amount_out: amount_out.into(),
        }
    }
}

/// Samples for one trade direction, ordered by `amount_in`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCurve {
    pub samples: Vec<Sample>,
    /// Input already routed through this direction by the simulation.
    #[serde(with = "amount", default)]
    pub consumed_in: BigUint,
}

impl SampleCurve {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            consumed_in: BigUint::zero(),
        }
    }

    /// Output for `amount_in` from an untouched pool, interpolated linearly
    /// between the bracketing samples.
    fn quote(&self, amount_in: &BigUint) -> PoolResult<BigUint> {
        if amount_in.is_zero() {
            return Ok(BigUint::zero());
        }

        let zero = BigUint::zero();
        let (mut prev_in, mut prev_out) = (&zero, &zero);
        for sample in &self.samples {
            if sample.amount_in < *prev_in || sample.amount_out < *prev_out {
                return Err(PoolError::InvalidState(
                    "samples must be increasing".to_string(),
                ));
            }
            if sample.amount_in >= *amount_in {
                let span_in = &sample.amount_in - prev_in;
                if span_in.is_zero() {
                    return Ok(sample.amount_out.clone());
                }
                let span_out = &sample.amount_out - prev_out;
                return Ok(prev_out + span_out * (amount_in - prev_in) / span_in);
            }
            prev_in = &sample.amount_in;
            prev_out = &sample.amount_out;
        }
        Err(PoolError::InsufficientLiquidity)
    }

    fn marginal_quote(&self, amount_in: &BigUint) -> PoolResult<BigUint> {
        let before = self.quote(&self.consumed_in)?;
        let after = self.quote(&(&self.consumed_in + amount_in))?;
        checked_reduce(&after, &before)
    }
}

/// Concentrated liquidity pool priced from pre-computed samples.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledPool {
    pub coin_a: CoinType,
    pub coin_b: CoinType,
    pub a_to_b: SampleCurve,
    pub b_to_a: SampleCurve,
}

impl SampledPool {
    pub fn new(
        coin_a: CoinType,
        coin_b: CoinType,
        a_to_b: Vec<Sample>,
        b_to_a: Vec<Sample>,
    ) -> Self {
        Self {
            coin_a,
            coin_b,
            a_to_b: SampleCurve::new(a_to_b),
            b_to_a: SampleCurve::new(b_to_a),
        }
    }

    fn curve(&self, coin_in: &CoinType) -> PoolResult<&SampleCurve> {
        if *coin_in == self.coin_a {
            Ok(&self.a_to_b)
        } else if *coin_in == self.coin_b {
            Ok(&self.b_to_a)
        } else {
            Err(PoolError::UnknownCoin(coin_in.clone()))
        }
    }

    fn with_consumed(&self, coin_in: &CoinType, consumed_in: BigUint) -> Self {
        let mut pool = self.clone();
        if *coin_in == self.coin_a {
            pool.a_to_b.consumed_in = consumed_in;
        } else {
            pool.b_to_a.consumed_in = consumed_in;
        }
        pool
    }
}

impl SwapMath for SampledPool {
    fn coin_types(&self) -> Vec<CoinType> {
        vec![self.coin_a.clone(), self.coin_b.clone()]
    }

    fn swap_exact_in(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
    ) -> PoolResult<BigUint> {
        self.curve(coin_in)?.marginal_quote(amount_in)
    }

    fn apply_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
        _amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let curve = self.curve(coin_in)?;
        Ok(self.with_consumed(coin_in, &curve.consumed_in + amount_in))
    }

    fn revert_trade(
        &self,
        coin_in: &CoinType,
        amount_in: &BigUint,
        _coin_out: &CoinType,
        _amount_out: &BigUint,
    ) -> PoolResult<Self> {
        let curve = self.curve(coin_in)?;
        Ok(self.with_consumed(coin_in, checked_reduce(&curve.consumed_in, amount_in)?))
    }
}
