use super::paths::{PoolOverrides, RoutePath};
use super::pool::{PoolError, PoolResult};
use super::types::{Direction, Graph, TradeRoute};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::cmp::Ordering;
use tracing::{debug, trace};

/// Knobs for splitting one trade across candidate routes.
#[derive(Clone, Debug)]
pub struct SplitSettings {
    /// Number of increments the amount is cut into.
    pub partition_count: usize,
    /// Routes always kept alive by narrowing.
    pub min_routes_to_keep: usize,
    /// Routes longer than this only receive increments nothing shorter can take.
    pub hop_budget: usize,
    pub probe_amount: BigUint,
}

pub fn optimize_amount_out(
    paths: Vec<RoutePath>,
    graph: &Graph,
    amount_in: &BigUint,
    settings: &SplitSettings,
) -> PoolResult<Vec<TradeRoute>> {
    Optimizer::new(paths, graph, amount_in.clone(), Direction::GivenIn, settings).optimize()
}

pub fn optimize_amount_in(
    paths: Vec<RoutePath>,
    graph: &Graph,
    amount_out: &BigUint,
    settings: &SplitSettings,
) -> PoolResult<Vec<TradeRoute>> {
    Optimizer::new(paths, graph, amount_out.clone(), Direction::GivenOut, settings).optimize()
}

struct Candidate {
    path: RoutePath,
    execution_cost: u64,
    /// Given-side amount routed so far.
    committed: BigUint,
    fill: Option<TradeRoute>,
    /// Marginal value of the most recent increment quote.
    last_quote: BigUint,
}

impl Candidate {
    fn is_used(&self) -> bool {
        !self.committed.is_zero()
    }

    // Computed side of the committed fill
    fn cumulative(&self, direction: Direction) -> BigUint {
        match (&self.fill, direction) {
            (Some(fill), Direction::GivenIn) => fill.coin_out.amount.clone(),
            (Some(fill), Direction::GivenOut) => fill.coin_in.amount.clone(),
            (None, _) => BigUint::zero(),
        }
    }
}

struct Quote {
    candidate: usize,
    marginal: BigUint,
    fill: TradeRoute,
    pools: PoolOverrides,
}

struct Optimizer<'a> {
    graph: &'a Graph,
    candidates: Vec<Candidate>,
    pools: PoolOverrides,
    total_amount: BigUint,
    direction: Direction,
    settings: &'a SplitSettings,
}

impl<'a> Optimizer<'a> {
    fn new(
        paths: Vec<RoutePath>,
        graph: &'a Graph,
        total_amount: BigUint,
        direction: Direction,
        settings: &'a SplitSettings,
    ) -> Self {
        let candidates = paths
            .into_iter()
            .map(|path| Candidate {
                execution_cost: path.execution_cost(graph),
                path,
                committed: BigUint::zero(),
                fill: None,
                last_quote: direction.sentinel(),
            })
            .collect();

        Self {
            graph,
            candidates,
            pools: PoolOverrides::new(),
            total_amount,
            direction,
            settings,
        }
    }

    fn optimize(mut self) -> PoolResult<Vec<TradeRoute>> {
        if self.candidates.is_empty() || self.total_amount.is_zero() {
            return Err(PoolError::InsufficientLiquidity);
        }

        // An increment no route can take yet is carried into the next one
        let mut pending = BigUint::zero();
        for (step, increment) in self.increments().into_iter().enumerate() {
            pending += increment;
            let quote = match self.best_quote(&pending, true) {
                Some(quote) => quote,
                None => match self.best_quote(&pending, false) {
                    Some(quote) => quote,
                    None => {
                        trace!(step, pending = %pending, "carrying unplaced increment");
                        continue;
                    }
                },
            };
            trace!(
                step,
                increment = %pending,
                marginal = %quote.marginal,
                legs = self.candidates[quote.candidate].path.len(),
                "committed increment"
            );
            self.commit(quote, &pending);
            pending = BigUint::zero();
            self.narrow();
        }
        if !pending.is_zero() {
            debug!(unplaced = %pending, "no route can absorb the rest of the trade");
            return Err(PoolError::InsufficientLiquidity);
        }

        let routes = self.settle()?;
        debug!(
            direction = ?self.direction,
            routes = routes.len(),
            "split trade across routes"
        );
        Ok(routes)
    }

    /// Cut the total into equal increments; the first one absorbs the
    /// remainder so the increments always add up to the total.
    fn increments(&self) -> Vec<BigUint> {
        let partitions = self.settings.partition_count.max(1);
        let count = self
            .total_amount
            .to_usize()
            .map_or(partitions, |amount| amount.min(partitions));

        let base = &self.total_amount / count;
        let remainder = &self.total_amount % count;
        let mut increments = vec![base.clone(); count];
        increments[0] = base + remainder;
        increments
    }

    fn within_budget(&self, candidate: &Candidate) -> bool {
        candidate.path.len() <= self.settings.hop_budget
    }

    fn best_quote(&mut self, increment: &BigUint, within_budget: bool) -> Option<Quote> {
        let mut best: Option<Quote> = None;

        for index in 0..self.candidates.len() {
            if self.within_budget(&self.candidates[index]) != within_budget {
                continue;
            }
            let quote = self.quote(index, increment);
            let last_quote = match &quote {
                Some(quote) => quote.marginal.clone(),
                None => self.direction.sentinel(),
            };
            self.candidates[index].last_quote = last_quote;

            if let Some(quote) = quote {
                let better = match &best {
                    None => true,
                    Some(current) => self.compare(&quote, current) == Ordering::Greater,
                };
                if better {
                    best = Some(quote);
                }
            }
        }
        best
    }

    /// Price `increment` on top of the candidate's committed fill. The fill
    /// itself is backed out first so the route is re-priced as one trade.
    fn quote(&self, index: usize, increment: &BigUint) -> Option<Quote> {
        let candidate = &self.candidates[index];
        let mut pools: PoolOverrides = candidate
            .path
            .hops
            .iter()
            .filter_map(|hop| {
                self.pools
                    .get(&hop.pool_id)
                    .map(|pool| (hop.pool_id.clone(), pool.clone()))
            })
            .collect();

        if let Some(fill) = &candidate.fill {
            candidate.path.revert_fill(fill, self.graph, &mut pools).ok()?;
        }

        let target = &candidate.committed + increment;
        let probe = &self.settings.probe_amount;
        let fill = match self.direction {
            Direction::GivenIn => candidate.path.get_amount_out(&target, self.graph, &mut pools, probe),
            Direction::GivenOut => candidate.path.get_amount_in(&target, self.graph, &mut pools, probe),
        }
        .ok()?;

        let previous = candidate.cumulative(self.direction);
        let current = match self.direction {
            Direction::GivenIn => &fill.coin_out.amount,
            Direction::GivenOut => &fill.coin_in.amount,
        };
        let marginal = if *current > previous {
            current - previous
        } else {
            BigUint::zero()
        };

        Some(Quote {
            candidate: index,
            marginal,
            fill,
            pools,
        })
    }

    // Greater means `a` is the better quote
    fn compare(&self, a: &Quote, b: &Quote) -> Ordering {
        if self.direction.improves(&a.marginal, &b.marginal) {
            return Ordering::Greater;
        }
        if self.direction.improves(&b.marginal, &a.marginal) {
            return Ordering::Less;
        }
        let route_a = &self.candidates[a.candidate];
        let route_b = &self.candidates[b.candidate];
        route_b
            .execution_cost
            .cmp(&route_a.execution_cost)
            .then_with(|| route_b.path.len().cmp(&route_a.path.len()))
    }

    fn commit(&mut self, quote: Quote, increment: &BigUint) {
        let candidate = &mut self.candidates[quote.candidate];
        candidate.committed += increment;
        candidate.fill = Some(quote.fill);
        self.pools.extend(quote.pools);
    }

    /// Drop the weakest unused routes, keeping `max(K, (K + n) / 2)` of the
    /// `n` live ones. Routes that already hold part of the trade always stay.
    fn narrow(&mut self) {
        let live = self.candidates.len();
        let floor = self.settings.min_routes_to_keep;
        let keep = floor.max((floor + live) / 2);
        if live <= keep {
            return;
        }

        let direction = self.direction;
        let (mut used, mut unused): (Vec<Candidate>, Vec<Candidate>) =
            self.candidates.drain(..).partition(Candidate::is_used);

        used.sort_by(|a, b| rank(direction, &a.cumulative(direction), &b.cumulative(direction)));
        unused.sort_by(|a, b| rank(direction, &a.last_quote, &b.last_quote));

        let keep = keep.max(used.len());
        used.extend(unused);
        used.truncate(keep);
        self.candidates = used;
    }

    /// Replay every route that received part of the trade, in order, on a
    /// fresh copy of the pool states.
    fn settle(&self) -> PoolResult<Vec<TradeRoute>> {
        let mut pools = PoolOverrides::new();
        let probe = &self.settings.probe_amount;
        self.candidates
            .iter()
            .filter(|candidate| candidate.is_used())
            .map(|candidate| match self.direction {
                Direction::GivenIn => {
                    candidate
                        .path
                        .get_amount_out(&candidate.committed, self.graph, &mut pools, probe)
                }
                Direction::GivenOut => {
                    candidate
                        .path
                        .get_amount_in(&candidate.committed, self.graph, &mut pools, probe)
                }
            })
            .collect()
    }
}

// Best first: most output for given-in, least input for given-out
fn rank(direction: Direction, a: &BigUint, b: &BigUint) -> Ordering {
    match direction {
        Direction::GivenIn => b.cmp(a),
        Direction::GivenOut => a.cmp(b),
    }
}
