use super::pool::{ratio_f64, Pool, PoolError, PoolResult};
use super::types::{CoinAmount, CoinType, Graph, PoolId, TradeLeg, TradeRoute};
use num_bigint::BigUint;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// One step of a candidate route.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Hop {
    pub pool_id: PoolId,
    pub coin_in: CoinType,
    pub coin_out: CoinType,
}

/// Pools and coins a route passes through, without amounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RoutePath {
    pub hops: Vec<Hop>,
}

/// Working pool states for a simulation. Pools missing from the map are read
/// from the graph.
pub type PoolOverrides = HashMap<PoolId, Pool>;

impl RoutePath {
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn contains_pool(&self, pool_id: &str) -> bool {
        self.hops.iter().any(|hop| hop.pool_id == pool_id)
    }

    pub fn last_coin(&self) -> Option<&CoinType> {
        self.hops.last().map(|hop| &hop.coin_out)
    }

    pub fn execution_cost(&self, graph: &Graph) -> u64 {
        self.hops
            .iter()
            .filter_map(|hop| graph.pool(&hop.pool_id))
            .map(|handle| handle.execution_cost)
            .sum()
    }

    fn extended(&self, hop: Hop) -> Self {
        let mut hops = self.hops.clone();
        hops.push(hop);
        Self { hops }
    }

    /// Simulate selling `amount_in` along the route, updating `pools` with
    /// the state after each leg.
    pub fn get_amount_out(
        &self,
        amount_in: &BigUint,
        graph: &Graph,
        pools: &mut PoolOverrides,
        probe_amount: &BigUint,
    ) -> PoolResult<TradeRoute> {
        let mut current_amount = amount_in.clone();
        let mut legs = Vec::with_capacity(self.hops.len());

        for hop in &self.hops {
            let pool = current_pool(hop, graph, pools)?;
            let amount_out = pool.trade_amount_out(&hop.coin_in, &current_amount, &hop.coin_out)?;
            let leg = trade_leg(hop, graph, &pool, &current_amount, &amount_out, probe_amount);

            let updated = pool.apply_trade(&hop.coin_in, &current_amount, &hop.coin_out, &amount_out)?;
            pools.insert(hop.pool_id.clone(), updated);
            legs.push(leg);
            current_amount = amount_out;
        }

        TradeRoute::from_legs(legs).ok_or_else(|| PoolError::InvalidState("empty route".to_string()))
    }

    /// Simulate buying exactly `amount_out` at the end of the route, walking
    /// the legs backwards.
    pub fn get_amount_in(
        &self,
        amount_out: &BigUint,
        graph: &Graph,
        pools: &mut PoolOverrides,
        probe_amount: &BigUint,
    ) -> PoolResult<TradeRoute> {
        let mut current_amount = amount_out.clone();
        let mut legs = Vec::with_capacity(self.hops.len());

        for hop in self.hops.iter().rev() {
            let pool = current_pool(hop, graph, pools)?;
            let amount_in = pool.trade_amount_in(&hop.coin_in, &hop.coin_out, &current_amount)?;
            let leg = trade_leg(hop, graph, &pool, &amount_in, &current_amount, probe_amount);

            let updated = pool.apply_trade(&hop.coin_in, &amount_in, &hop.coin_out, &current_amount)?;
            pools.insert(hop.pool_id.clone(), updated);
            legs.push(leg);
            current_amount = amount_in;
        }
        legs.reverse();

        TradeRoute::from_legs(legs).ok_or_else(|| PoolError::InvalidState("empty route".to_string()))
    }

    /// Back a previously simulated fill out of `pools`, last leg first.
    pub fn revert_fill(&self, fill: &TradeRoute, graph: &Graph, pools: &mut PoolOverrides) -> PoolResult<()> {
        for leg in fill.legs.iter().rev() {
            let hop = self
                .hops
                .iter()
                .find(|hop| hop.pool_id == leg.pool_id)
                .ok_or_else(|| PoolError::InvalidState(format!("{} is not on the route", leg.pool_id)))?;
            let pool = current_pool(hop, graph, pools)?;
            let reverted = pool.revert_trade(
                &leg.coin_in.coin_type,
                &leg.coin_in.amount,
                &leg.coin_out.coin_type,
                &leg.coin_out.amount,
            )?;
            pools.insert(hop.pool_id.clone(), reverted);
        }
        Ok(())
    }
}

fn current_pool(hop: &Hop, graph: &Graph, pools: &PoolOverrides) -> PoolResult<Pool> {
    if let Some(pool) = pools.get(&hop.pool_id) {
        return Ok(pool.clone());
    }
    graph
        .pool(&hop.pool_id)
        .map(|handle| handle.pool.clone())
        .ok_or_else(|| PoolError::InvalidState(format!("unknown pool {}", hop.pool_id)))
}

// Leg record priced on the pool state before the trade
fn trade_leg(
    hop: &Hop,
    graph: &Graph,
    pool: &Pool,
    amount_in: &BigUint,
    amount_out: &BigUint,
    probe_amount: &BigUint,
) -> TradeLeg {
    let spot_price = pool
        .spot_price(&hop.coin_in, &hop.coin_out, probe_amount)
        .unwrap_or_else(|_| ratio_f64(amount_in, amount_out));
    let protocol = graph
        .pool(&hop.pool_id)
        .map(|handle| handle.protocol.clone())
        .unwrap_or_default();

    TradeLeg {
        pool_id: hop.pool_id.clone(),
        protocol,
        coin_in: CoinAmount::new(hop.coin_in.clone(), amount_in.clone()),
        coin_out: CoinAmount::new(hop.coin_out.clone(), amount_out.clone()),
        spot_price,
    }
}

/// Enumerate every route from `coin_in` to `coin_out` with at most
/// `max_hops` legs.
///
/// Routes never reuse a pool or return to `coin_in`, and pools flagged
/// no-chaining only appear as the single leg of a direct route.
pub fn find_routes(
    graph: &Graph,
    coin_in: &CoinType,
    coin_out: &CoinType,
    max_hops: usize,
) -> Vec<RoutePath> {
    let mut routes = Vec::new();
    if coin_in == coin_out || max_hops == 0 {
        return routes;
    }

    let mut frontier = VecDeque::from([RoutePath::default()]);
    while let Some(path) = frontier.pop_front() {
        let current = path.last_coin().unwrap_or(coin_in);
        let Some(node) = graph.coin_nodes.get(current) else {
            continue;
        };

        for (next_coin, pool_ids) in &node.edges {
            if next_coin == coin_in {
                continue;
            }
            let reaches_target = next_coin == coin_out;

            for pool_id in pool_ids {
                if path.contains_pool(pool_id) {
                    continue;
                }
                let Some(handle) = graph.pool(pool_id) else {
                    continue;
                };
                if handle.no_chaining && !(path.is_empty() && reaches_target) {
                    continue;
                }

                let extended = path.extended(Hop {
                    pool_id: pool_id.clone(),
                    coin_in: current.clone(),
                    coin_out: next_coin.clone(),
                });
                if reaches_target {
                    routes.push(extended);
                } else if extended.len() < max_hops {
                    frontier.push_back(extended);
                }
            }
        }
    }

    debug!(
        coin_in = %coin_in,
        coin_out = %coin_out,
        max_hops,
        routes = routes.len(),
        "enumerated candidate routes"
    );
    routes
}
