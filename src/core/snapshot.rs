use super::pool::Pool;
use super::types::PoolId;
use super::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// One pool as delivered by the pool-state provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub id: PoolId,
    pub protocol: String,
    pub pool: Pool,
    /// Overrides the protocol's configured execution cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_cost: Option<u64>,
}

impl PoolEntry {
    pub fn new(id: impl Into<PoolId>, protocol: impl Into<String>, pool: Pool) -> Self {
        Self {
            id: id.into(),
            protocol: protocol.into(),
            pool,
            execution_cost: None,
        }
    }

    pub fn with_execution_cost(mut self, execution_cost: u64) -> Self {
        self.execution_cost = Some(execution_cost);
        self
    }
}

/// Every pool the router may consider for one request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PoolSnapshot {
    pub pools: Vec<PoolEntry>,
}

impl PoolSnapshot {
    pub fn new(pools: Vec<PoolEntry>) -> Self {
        Self { pools }
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn protocols(&self) -> HashSet<&str> {
        self.pools.iter().map(|entry| entry.protocol.as_str()).collect()
    }
}

// Persist a snapshot the way an indexer caches pool state between runs
pub fn write_snapshot_on_disk<P: AsRef<Path>>(path: P, snapshot: &PoolSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)
        .context("Error serializing pool snapshot".to_string())?;

    fs::write(path, json).context("Error writing pool snapshot on disk".to_string())?;
    Ok(())
}

pub fn read_snapshot_from_disk<P: AsRef<Path>>(path: P) -> Result<PoolSnapshot> {
    let json = fs::read_to_string(path).context("Couldn't open pool snapshot file".to_string())?;
    let snapshot: PoolSnapshot =
        serde_json::from_str(&json).context("Error parsing pool snapshot".to_string())?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::{ConstantProductPool, LiquidStakingPool};
    use crate::core::types::CoinType;
    use num_bigint::BigUint;

    fn snapshot() -> PoolSnapshot {
        PoolSnapshot::new(vec![
            PoolEntry::new(
                "0xpool1",
                "uniswap",
                Pool::ConstantProduct(ConstantProductPool::new(
                    CoinType::new("0x2::sui::SUI"),
                    CoinType::new("0x3::usdc::USDC"),
                    BigUint::from(10u64).pow(30),
                    BigUint::from(5_000u32),
                    30,
                )),
            ),
            PoolEntry::new(
                "0xpool2",
                "staking",
                Pool::LiquidStaking(LiquidStakingPool::new(
                    CoinType::new("0x2::sui::SUI"),
                    CoinType::new("0x4::st::ST"),
                    BigUint::from(10u64).pow(18),
                    BigUint::from(1u32),
                    10,
                    BigUint::from(100u32),
                )),
            )
            .with_execution_cost(7),
        ])
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        write_snapshot_on_disk(&path, &snapshot()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        // amounts wider than u64 are stored as decimal strings
        assert!(raw.contains("\"1000000000000000000000000000000\""));

        assert_eq!(read_snapshot_from_disk(&path).unwrap(), snapshot());
    }

    #[test]
    fn missing_file_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_snapshot_from_disk(dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("pool snapshot"));
    }

    #[test]
    fn short_addresses_are_canonical_after_load() {
        let json = r#"{"pools":[{"id":"p","protocol":"cp","pool":{"kind":"constant_product",
            "coin_x":"0x2::sui::SUI","coin_y":"0x3::usdc::USDC",
            "reserve_x":"10","reserve_y":20,"fee_bps":0}}]}"#;
        let snapshot: PoolSnapshot = serde_json::from_str(json).unwrap();
        let coins = snapshot.pools[0].pool.coin_types();
        assert_eq!(coins[0], CoinType::new("0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI"));
        assert_eq!(snapshot.protocols().len(), 1);
    }
}
