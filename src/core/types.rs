use super::constants::{ADDRESS_HEX_LENGTH, INFINITE};
use super::pool::Pool;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub type PoolId = String;

/// Fully qualified coin type, always stored in canonical form.
///
/// Address-like prefixes (`0x2::sui::SUI`) are lower-cased and left-padded to
/// a full-width address so that two spellings of the same type compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CoinType(String);

impl CoinType {
    pub fn new(raw: &str) -> Self {
        CoinType(normalize_coin_type(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CoinType {
    fn from(raw: String) -> Self {
        CoinType::new(&raw)
    }
}

impl From<&str> for CoinType {
    fn from(raw: &str) -> Self {
        CoinType::new(raw)
    }
}

impl From<CoinType> for String {
    fn from(coin: CoinType) -> Self {
        coin.0
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize_coin_type(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len() + ADDRESS_HEX_LENGTH);
    let mut segment = String::new();

    for c in raw.chars().filter(|c| !c.is_whitespace()) {
        if matches!(c, '<' | '>' | ',') {
            normalized.push_str(&normalize_type_path(&segment));
            segment.clear();
            normalized.push(c);
        } else {
            segment.push(c);
        }
    }
    normalized.push_str(&normalize_type_path(&segment));
    normalized
}

// `address::module::Name`; only the address part is rewritten
fn normalize_type_path(path: &str) -> String {
    let Some((address, tail)) = path.split_once("::") else {
        return path.to_string();
    };
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);

    if digits.is_empty()
        || digits.len() > ADDRESS_HEX_LENGTH
        || !digits.chars().all(|c| c.is_ascii_hexdigit())
    {
        return path.to_string();
    }

    format!(
        "0x{:0>width$}::{}",
        digits.to_ascii_lowercase(),
        tail,
        width = ADDRESS_HEX_LENGTH
    )
}

/// Whether the caller fixed the amount sold or the amount bought.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    GivenIn,
    GivenOut,
}

impl Direction {
    /// Score assigned to a branch that cannot be simulated.
    ///
    /// Given-in maximizes output so a dead branch scores zero; given-out
    /// minimizes input so a dead branch costs an out-of-range amount.
    pub fn sentinel(&self) -> BigUint {
        match self {
            Direction::GivenIn => BigUint::zero(),
            Direction::GivenOut => INFINITE(),
        }
    }

    /// True when `candidate` is strictly preferable to `incumbent`.
    pub fn improves(&self, candidate: &BigUint, incumbent: &BigUint) -> bool {
        match self {
            Direction::GivenIn => candidate > incumbent,
            Direction::GivenOut => candidate < incumbent,
        }
    }
}

/// Fee routed to a third party on top of the trade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalFee {
    pub recipient: String,
    /// Fraction of the charged side, e.g. `0.01` for 1%.
    pub percentage: f64,
}

/// Per-protocol knobs handed explicitly to the graph builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    pub enabled: bool,
    pub no_chaining: bool,
    pub execution_cost: Option<u64>,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            no_chaining: false,
            execution_cost: None,
        }
    }
}

/// One pool as seen by the router.
#[derive(Clone, Debug)]
pub struct PoolHandle {
    pub id: PoolId,
    pub protocol: String,
    pub pool: Pool,
    pub coin_types: Vec<CoinType>,
    /// Relative cost of executing a swap through this pool. Only used to
    /// break ties between otherwise equal routes.
    pub execution_cost: u64,
    /// Pools that can only be the single hop of a route.
    pub no_chaining: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CoinNode {
    pub coin_type: CoinType,
    /// Reachable coin type -> pools offering that edge.
    pub edges: BTreeMap<CoinType, Vec<PoolId>>,
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub coin_nodes: HashMap<CoinType, CoinNode>,
    pub pools: HashMap<PoolId, Arc<PoolHandle>>,
}

impl Default for CoinType {
    fn default() -> Self {
        CoinType(String::new())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinAmount {
    pub coin_type: CoinType,
    #[serde(with = "amount")]
    pub amount: BigUint,
    #[serde(with = "amount")]
    pub fee: BigUint,
}

impl CoinAmount {
    pub fn new(coin_type: CoinType, amount: BigUint) -> Self {
        Self {
            coin_type,
            amount,
            fee: BigUint::zero(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeLeg {
    pub pool_id: PoolId,
    pub protocol: String,
    pub coin_in: CoinAmount,
    pub coin_out: CoinAmount,
    pub spot_price: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeRoute {
    pub legs: Vec<TradeLeg>,
    pub coin_in: CoinAmount,
    pub coin_out: CoinAmount,
    pub spot_price: f64,
}

impl TradeRoute {
    pub fn from_legs(legs: Vec<TradeLeg>) -> Option<Self> {
        let first = legs.first()?;
        let last = legs.last()?;
        let coin_in = first.coin_in.clone();
        let coin_out = last.coin_out.clone();
        let spot_price = legs.iter().map(|leg| leg.spot_price).product();

        Some(Self {
            legs,
            coin_in,
            coin_out,
            spot_price,
        })
    }
}

/// Final answer handed to the transaction builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompleteTradeRoute {
    pub routes: Vec<TradeRoute>,
    pub coin_in: CoinAmount,
    pub coin_out: CoinAmount,
    pub spot_price: f64,
    pub direction: Direction,
    pub referrer: Option<String>,
    pub external_fee: Option<ExternalFee>,
}

/// Serde helpers writing amounts as decimal strings.
pub mod amount {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Text(String),
        Number(u64),
    }

    impl RawAmount {
        fn into_biguint<E: de::Error>(self) -> Result<BigUint, E> {
            match self {
                RawAmount::Text(text) => BigUint::from_str(text.trim()).map_err(E::custom),
                RawAmount::Number(number) => Ok(BigUint::from(number)),
            }
        }
    }

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        RawAmount::deserialize(deserializer)?.into_biguint()
    }

    pub mod vec {
        use super::RawAmount;
        use num_bigint::BigUint;
        use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            values: &[BigUint],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for value in values {
                seq.serialize_element(&value.to_string())?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<BigUint>, D::Error> {
            Vec::<RawAmount>::deserialize(deserializer)?
                .into_iter()
                .map(RawAmount::into_biguint)
                .collect()
        }
    }
}
