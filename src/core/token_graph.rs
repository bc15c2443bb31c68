use super::snapshot::PoolEntry;
use super::types::{CoinNode, CoinType, Graph, PoolHandle, ProtocolSettings};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Build the coin graph for one request.
///
/// Pools of excluded or disabled protocols are left out. Every other pool
/// adds a directed edge between each ordered pair of the coins it holds.
pub fn build_graph(
    entries: &[PoolEntry],
    protocols: &HashMap<String, ProtocolSettings>,
    excluded_protocols: &[String],
) -> Graph {
    let mut graph = Graph::default();
    let default_settings = ProtocolSettings::default();

    for entry in entries {
        if excluded_protocols.contains(&entry.protocol) {
            continue;
        }
        let settings = protocols.get(&entry.protocol).unwrap_or(&default_settings);
        if !settings.enabled {
            continue;
        }

        let coin_types = entry.pool.coin_types();
        let handle = PoolHandle {
            id: entry.id.clone(),
            protocol: entry.protocol.clone(),
            pool: entry.pool.clone(),
            coin_types: coin_types.clone(),
            execution_cost: entry
                .execution_cost
                .or(settings.execution_cost)
                .unwrap_or_else(|| entry.pool.default_execution_cost()),
            no_chaining: entry.pool.requires_single_hop() || settings.no_chaining,
        };
        graph.add_pool(Arc::new(handle));
    }

    debug!(
        coins = graph.coin_nodes.len(),
        pools = graph.pools.len(),
        "built coin graph"
    );
    graph
}

impl Graph {
    fn add_pool(&mut self, handle: Arc<PoolHandle>) {
        for from in &handle.coin_types {
            for to in &handle.coin_types {
                if from != to {
                    self.add_edge(from, to, &handle.id);
                }
            }
        }
        self.pools.insert(handle.id.clone(), handle);
    }

    fn add_edge(&mut self, from: &CoinType, to: &CoinType, pool_id: &str) {
        let node = self
            .coin_nodes
            .entry(from.clone())
            .or_insert_with(|| CoinNode {
                coin_type: from.clone(),
                ..CoinNode::default()
            });
        let pools = node.edges.entry(to.clone()).or_default();
        if !pools.iter().any(|id| id == pool_id) {
            pools.push(pool_id.to_string());
        }
    }

    pub fn pool(&self, pool_id: &str) -> Option<&Arc<PoolHandle>> {
        self.pools.get(pool_id)
    }

    /// Pools offering a direct `from -> to` edge.
    pub fn pools_between(&self, from: &CoinType, to: &CoinType) -> &[String] {
        self.coin_nodes
            .get(from)
            .and_then(|node| node.edges.get(to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
