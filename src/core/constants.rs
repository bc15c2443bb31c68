use num_bigint::BigUint;
use num_traits::One;

/// Denominator for every fee expressed in basis points.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// 18-decimal fixed point unit used by weighted pools and staking rates.
pub const FIXED_ONE: u128 = 1_000_000_000_000_000_000;

/// Order book prices are quote units per base unit scaled by 1e9.
pub const ORDER_BOOK_PRICE_SCALE: u64 = 1_000_000_000;

/// Newton iterations allowed when solving the stable invariant.
pub const STABLE_MAX_ITERATIONS: usize = 255;

pub const SPOT_PRICE_PROBE_ATTEMPTS: u32 = 12;

pub const DEFAULT_PARTITION_COUNT: usize = 75;
pub const DEFAULT_MIN_ROUTES_TO_KEEP: usize = 20;
pub const DEFAULT_MAX_HOPS: usize = 3;
pub const DEFAULT_MAX_EXTERNAL_FEE_PERCENTAGE: f64 = 0.5;
pub const DEFAULT_SPOT_PRICE_PROBE_AMOUNT: u64 = 1_000_000;

/// Length of a fully padded ledger address, without the `0x` prefix.
pub const ADDRESS_HEX_LENGTH: usize = 64;

// Out-of-range magnitude used as the "infinitely expensive" amount
#[allow(non_snake_case)]
pub fn INFINITE() -> BigUint {
    BigUint::one() << 256u32
}

#[allow(non_snake_case)]
pub fn ONE() -> BigUint {
    BigUint::from(FIXED_ONE)
}
