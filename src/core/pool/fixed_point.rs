//! 18-decimal fixed point arithmetic for weighted pools.
//!
//! `pow` is evaluated as `exp(y * ln(x))` at 36 decimals of internal
//! precision; the rounded variants widen the raw result by a relative error
//! bound so callers can round in the pool's favor.

use super::{PoolError, PoolResult};
use crate::core::constants::{FIXED_ONE, ONE};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Signed, Zero};

/// Relative error allowed on `pow`, 1e-14 in 18-decimal fixed point.
const MAX_POW_RELATIVE_ERROR: u64 = 10_000;

// ln(2) with 36 decimals
const LN2_36: u128 = 693_147_180_559_945_309_417_232_121_458_176_568;

const MAX_EXP_SHIFT: u64 = 1024;

fn one_36() -> BigInt {
    BigInt::from(FIXED_ONE) * BigInt::from(FIXED_ONE)
}

fn ln2_36() -> BigInt {
    BigInt::from(LN2_36)
}

pub fn mul_down(a: &BigUint, b: &BigUint) -> BigUint {
    a * b / ONE()
}

pub fn mul_up(a: &BigUint, b: &BigUint) -> BigUint {
    let product = a * b;
    if product.is_zero() {
        return product;
    }
    (product - 1u32) / ONE() + 1u32
}

pub fn div_down(a: &BigUint, b: &BigUint) -> PoolResult<BigUint> {
    if b.is_zero() {
        return Err(PoolError::InvalidState("division by zero".to_string()));
    }
    Ok(a * ONE() / b)
}

pub fn div_up(a: &BigUint, b: &BigUint) -> PoolResult<BigUint> {
    if b.is_zero() {
        return Err(PoolError::InvalidState("division by zero".to_string()));
    }
    if a.is_zero() {
        return Ok(BigUint::zero());
    }
    Ok((a * ONE() - 1u32) / b + 1u32)
}

/// `1 - x`, floored at zero.
pub fn complement(x: &BigUint) -> BigUint {
    let one = ONE();
    if *x < one {
        one - x
    } else {
        BigUint::zero()
    }
}

pub fn pow_down(base: &BigUint, exponent: &BigUint) -> PoolResult<BigUint> {
    if let Some(exact) = exact_pow(base, exponent) {
        return Ok(exact);
    }
    let raw = pow(base, exponent)?;
    let max_error = mul_up(&raw, &BigUint::from(MAX_POW_RELATIVE_ERROR)) + 1u32;
    if raw < max_error {
        Ok(BigUint::zero())
    } else {
        Ok(raw - max_error)
    }
}

pub fn pow_up(base: &BigUint, exponent: &BigUint) -> PoolResult<BigUint> {
    if let Some(exact) = exact_pow(base, exponent) {
        return Ok(exact);
    }
    let raw = pow(base, exponent)?;
    let max_error = mul_up(&raw, &BigUint::from(MAX_POW_RELATIVE_ERROR)) + 1u32;
    Ok(raw + max_error)
}

// Exponents and bases that need no approximation
fn exact_pow(base: &BigUint, exponent: &BigUint) -> Option<BigUint> {
    let one = ONE();
    if exponent.is_zero() || *base == one {
        Some(one)
    } else if base.is_zero() {
        Some(BigUint::zero())
    } else if *exponent == one {
        Some(base.clone())
    } else {
        None
    }
}

/// `base ^ exponent` for 18-decimal operands, unrounded.
pub fn pow(base: &BigUint, exponent: &BigUint) -> PoolResult<BigUint> {
    if let Some(exact) = exact_pow(base, exponent) {
        return Ok(exact);
    }
    let scale = BigInt::from(FIXED_ONE);
    let base_36 = BigInt::from(base.clone()) * &scale;
    let log = ln_36(&base_36)?;
    let product = log * BigInt::from(exponent.clone()) / &scale;
    let result_36 = exp_36(&product)?;

    (result_36 / scale)
        .to_biguint()
        .ok_or_else(|| PoolError::InvalidState("negative power".to_string()))
}

// Natural log of a positive 36-decimal value
fn ln_36(x: &BigInt) -> PoolResult<BigInt> {
    if !x.is_positive() {
        return Err(PoolError::InvalidState("logarithm of zero".to_string()));
    }
    let one = one_36();
    if *x < one {
        let inverse = &one * &one / x;
        return Ok(-ln_36(&inverse)?);
    }

    // x = z * 2^k with z in [1, 2)
    let mut z = x.clone();
    let mut k = 0u64;
    let two = &one * 2;
    while z >= two {
        z >>= 1;
        k += 1;
    }

    // ln(z) = 2 * atanh((z - 1) / (z + 1))
    let t = (&z - &one) * &one / (&z + &one);
    let t_squared = &t * &t / &one;
    let mut term = t.clone();
    let mut sum = t;
    let mut denominator = 1u64;
    loop {
        term = term * &t_squared / &one;
        denominator += 2;
        let contribution = &term / denominator;
        if contribution.is_zero() {
            break;
        }
        sum += contribution;
    }

    Ok(ln2_36() * k + sum * 2)
}

// e^y for a 36-decimal exponent
fn exp_36(y: &BigInt) -> PoolResult<BigInt> {
    let one = one_36();
    if y.sign() == Sign::Minus {
        let positive = exp_36(&-y)?;
        return Ok(&one * &one / positive);
    }

    // y = k * ln2 + r with r in [0, ln2)
    let ln2 = ln2_36();
    let k = y / &ln2;
    let r = y - &k * &ln2;
    let shift: u64 = k
        .try_into()
        .ok()
        .filter(|shift| *shift <= MAX_EXP_SHIFT)
        .ok_or_else(|| PoolError::InvalidState("exponent overflow".to_string()))?;

    let mut term = one.clone();
    let mut sum = one.clone();
    let mut n = 1u64;
    loop {
        term = term * &r / (&one * n);
        if term.is_zero() {
            break;
        }
        sum += &term;
        n += 1;
    }

    Ok(sum << shift)
}
