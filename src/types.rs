use crate::core::types::{amount, CoinType, Direction, ExternalFee, ProtocolSettings};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One routing request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub coin_in: CoinType,
    pub coin_out: CoinType,
    /// Amount sold for given-in requests, amount bought for given-out ones.
    #[serde(with = "amount")]
    pub amount: BigUint,
    pub direction: Direction,
    /// Overrides the configured hop limit.
    #[serde(default)]
    pub max_hops: Option<usize>,
    #[serde(default)]
    pub excluded_protocols: Vec<String>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub external_fee: Option<ExternalFee>,
}

impl RouteRequest {
    pub fn given_in(coin_in: CoinType, coin_out: CoinType, amount_in: BigUint) -> Self {
        Self::new(coin_in, coin_out, amount_in, Direction::GivenIn)
    }

    pub fn given_out(coin_in: CoinType, coin_out: CoinType, amount_out: BigUint) -> Self {
        Self::new(coin_in, coin_out, amount_out, Direction::GivenOut)
    }

    fn new(coin_in: CoinType, coin_out: CoinType, amount: BigUint, direction: Direction) -> Self {
        Self {
            coin_in,
            coin_out,
            amount,
            direction,
            max_hops: None,
            excluded_protocols: vec![],
            referrer: None,
            external_fee: None,
        }
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = Some(max_hops);
        self
    }

    pub fn excluding(mut self, protocol: impl Into<String>) -> Self {
        self.excluded_protocols.push(protocol.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_external_fee(mut self, recipient: impl Into<String>, percentage: f64) -> Self {
        self.external_fee = Some(ExternalFee {
            recipient: recipient.into(),
            percentage,
        });
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    pub partition_count: usize,
    pub min_routes_to_keep: usize,
    pub max_hops: usize,
    /// Routes longer than this are only used when nothing shorter can take
    /// an increment. Defaults to `max_hops`.
    pub hop_budget: Option<usize>,
    /// External fees must stay strictly below this fraction.
    pub max_external_fee_percentage: f64,
    pub spot_price_probe_amount: u64,
    /// Settings keyed by protocol name.
    pub protocols: HashMap<String, ProtocolSettings>,
}
