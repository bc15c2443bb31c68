use super::core::optimization::{optimize_amount_in, optimize_amount_out, SplitSettings};
use super::core::paths::find_routes;
use super::core::route::assemble_complete_route;
use super::core::snapshot::PoolSnapshot;
use super::core::token_graph::build_graph;
use super::core::types::{CompleteTradeRoute, Direction};
use super::error::RouterError;
use super::types::{RouteRequest, RouterConfig};
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::{debug, info, warn};

/// Reject requests that can never be routed before any simulation runs.
pub fn validate_request(
    config: &RouterConfig,
    snapshot: &PoolSnapshot,
    request: &RouteRequest,
) -> Result<(), RouterError> {
    config.validate()?;

    if snapshot.is_empty() {
        return Err(RouterError::configuration("pool snapshot is empty"));
    }
    if request.amount.is_zero() {
        return Err(RouterError::configuration("trade amount must be positive"));
    }
    if request.coin_in == request.coin_out {
        return Err(RouterError::configuration(format!(
            "cannot route {} into itself",
            request.coin_in
        )));
    }
    if request.max_hops == Some(0) {
        return Err(RouterError::configuration("max_hops must be at least 1"));
    }
    if let Some(fee) = &request.external_fee {
        let max = config.max_external_fee_percentage;
        if !fee.percentage.is_finite() || fee.percentage < 0.0 || fee.percentage >= max {
            return Err(RouterError::configuration(format!(
                "external fee {} must be at least 0 and below {}",
                fee.percentage, max
            )));
        }
    }
    Ok(())
}

/// Find the best way to fill `request` against the pools in `snapshot`.
pub fn find_best_route(
    config: &RouterConfig,
    snapshot: &PoolSnapshot,
    request: &RouteRequest,
) -> Result<CompleteTradeRoute, RouterError> {
    if let Err(err) = validate_request(config, snapshot, request) {
        warn!(error = %err, "rejected route request");
        return Err(err);
    }

    let graph = build_graph(&snapshot.pools, &config.protocols, &request.excluded_protocols);
    let max_hops = request.max_hops.unwrap_or(config.max_hops);
    let paths = find_routes(&graph, &request.coin_in, &request.coin_out, max_hops);
    if paths.is_empty() {
        warn!(coin_in = %request.coin_in, coin_out = %request.coin_out, "no candidate routes");
        return Err(RouterError::no_route(&request.coin_in, &request.coin_out));
    }
    debug!(candidates = paths.len(), max_hops, "optimizing split");

    let settings = SplitSettings {
        partition_count: config.partition_count,
        min_routes_to_keep: config.min_routes_to_keep,
        hop_budget: config.hop_budget().min(max_hops),
        probe_amount: BigUint::from(config.spot_price_probe_amount),
    };
    let routes = match request.direction {
        Direction::GivenIn => optimize_amount_out(paths, &graph, &request.amount, &settings),
        Direction::GivenOut => optimize_amount_in(paths, &graph, &request.amount, &settings),
    }
    .map_err(|err| {
        warn!(error = %err, "no route can absorb the requested amount");
        RouterError::no_route(&request.coin_in, &request.coin_out)
    })?;

    let complete = assemble_complete_route(
        routes,
        request.direction,
        request.referrer.clone(),
        request.external_fee.clone(),
    )
    .ok_or_else(|| RouterError::no_route(&request.coin_in, &request.coin_out))?;

    info!(
        coin_in = %complete.coin_in.coin_type,
        amount_in = %complete.coin_in.amount,
        coin_out = %complete.coin_out.coin_type,
        amount_out = %complete.coin_out.amount,
        routes = complete.routes.len(),
        "found route"
    );
    Ok(complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::{ConstantProductPool, Pool};
    use crate::core::snapshot::PoolEntry;
    use crate::core::types::CoinType;

    fn coin(name: &str) -> CoinType {
        CoinType::new(&format!("0x1::{name}::{}", name.to_uppercase()))
    }

    fn snapshot() -> PoolSnapshot {
        PoolSnapshot::new(vec![PoolEntry::new(
            "ab",
            "cp",
            Pool::ConstantProduct(ConstantProductPool::new(
                coin("a"),
                coin("b"),
                BigUint::from(1_000_000u32),
                BigUint::from(1_000_000u32),
                30,
            )),
        )])
    }

    fn request() -> RouteRequest {
        RouteRequest::given_in(coin("a"), coin("b"), BigUint::from(1_000u32))
    }

    #[test]
    fn rejects_degenerate_requests() {
        let config = RouterConfig::default();
        let cases = [
            RouteRequest::given_in(coin("a"), coin("b"), BigUint::zero()),
            RouteRequest::given_in(coin("a"), coin("a"), BigUint::from(1u32)),
            request().with_max_hops(0),
            request().with_external_fee("0xfee", -0.1),
            request().with_external_fee("0xfee", f64::NAN),
        ];
        for case in cases {
            assert!(matches!(
                find_best_route(&config, &snapshot(), &case),
                Err(RouterError::Configuration(_))
            ));
        }
        assert!(matches!(
            find_best_route(&config, &PoolSnapshot::default(), &request()),
            Err(RouterError::Configuration(_))
        ));
    }

    #[test]
    fn excluded_protocol_leaves_no_route() {
        let err = find_best_route(&RouterConfig::default(), &snapshot(), &request().excluding("cp"))
            .unwrap_err();
        assert_eq!(err, RouterError::no_route(&coin("a"), &coin("b")));
    }

    #[test]
    fn routes_a_direct_swap() {
        let complete = find_best_route(&RouterConfig::default(), &snapshot(), &request()).unwrap();
        assert_eq!(complete.direction, Direction::GivenIn);
        assert_eq!(complete.coin_in.amount, BigUint::from(1_000u32));
        // 1000 * 9970 * 1e6 / (1e10 + 9_970_000)
        assert_eq!(complete.coin_out.amount, BigUint::from(996u32));
    }
}
