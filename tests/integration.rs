use liquidity_router::core::constants::ONE;
use liquidity_router::core::pool::{
    BookLevel, ConstantProductPool, LiquidStakingPool, OrderBookPool, Pool, StableCoin,
    StablePool, WeightedCoin, WeightedPool,
};
use liquidity_router::core::snapshot::{read_snapshot_from_disk, write_snapshot_on_disk};
use liquidity_router::{
    find_best_route, spawn_router_worker, CoinType, CompleteTradeRoute, Direction, PoolEntry,
    PoolSnapshot, RouteRequest, RouterConfig, RouterError,
};
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

fn coin(name: &str) -> CoinType {
    CoinType::new(&format!("0x1::{name}::{}", name.to_uppercase()))
}

fn cp(id: &str, x: &str, y: &str, reserve_x: u64, reserve_y: u64, fee_bps: u32) -> PoolEntry {
    PoolEntry::new(
        id,
        "cp",
        Pool::ConstantProduct(ConstantProductPool::new(
            coin(x),
            coin(y),
            BigUint::from(reserve_x),
            BigUint::from(reserve_y),
            fee_bps,
        )),
    )
}

fn book(id: &str, base: &str, quote: &str, depth: u64) -> PoolEntry {
    let price = 1_000_000_000u64;
    PoolEntry::new(
        id,
        "book",
        Pool::OrderBook(OrderBookPool::new(
            coin(base),
            coin(quote),
            vec![BookLevel::new(price, depth)],
            vec![BookLevel::new(price, depth)],
            BigUint::from(1u32),
            0,
        )),
    )
}

fn config_with_partitions(partition_count: usize) -> RouterConfig {
    RouterConfig {
        partition_count,
        ..RouterConfig::default()
    }
}

fn assert_well_formed(complete: &CompleteTradeRoute, request: &RouteRequest, max_hops: usize) {
    let mut total_in = BigUint::from(0u32);
    let mut total_out = BigUint::from(0u32);

    for route in &complete.routes {
        assert!(!route.legs.is_empty());
        assert!(route.legs.len() <= max_hops);
        assert_eq!(route.coin_in, route.legs[0].coin_in);
        assert_eq!(route.coin_out, route.legs[route.legs.len() - 1].coin_out);
        assert_eq!(route.coin_in.coin_type, request.coin_in);
        assert_eq!(route.coin_out.coin_type, request.coin_out);

        for pair in route.legs.windows(2) {
            assert_eq!(pair[0].coin_out.coin_type, pair[1].coin_in.coin_type);
            assert_eq!(pair[0].coin_out.amount, pair[1].coin_in.amount);
        }

        let pools: HashSet<&str> = route.legs.iter().map(|leg| leg.pool_id.as_str()).collect();
        assert_eq!(pools.len(), route.legs.len(), "route reuses a pool");

        if route.legs.iter().any(|leg| leg.protocol == "book") {
            assert_eq!(route.legs.len(), 1, "order book chained behind another hop");
        }

        total_in += &route.coin_in.amount;
        total_out += &route.coin_out.amount;
    }

    assert_eq!(total_in, complete.coin_in.amount);
    assert_eq!(total_out, complete.coin_out.amount);
    match request.direction {
        Direction::GivenIn => assert_eq!(complete.coin_in.amount, request.amount),
        Direction::GivenOut => assert_eq!(complete.coin_out.amount, request.amount),
    }
}

#[test]
fn weighted_pool_quote() {
    let half = ONE() / 2u32;
    let snapshot = PoolSnapshot::new(vec![PoolEntry::new(
        "w",
        "weighted",
        Pool::Weighted(WeightedPool::new(
            vec![
                WeightedCoin::new(coin("a"), BigUint::from(1000u32), half.clone()),
                WeightedCoin::new(coin("b"), BigUint::from(1000u32), half),
            ],
            coin("lp"),
            BigUint::from(1000u32),
        )),
    )]);
    let request = RouteRequest::given_in(coin("a"), coin("b"), BigUint::from(100u32));

    let complete = find_best_route(&RouterConfig::default(), &snapshot, &request).unwrap();
    assert_eq!(complete.coin_out.amount, BigUint::from(90u32));
    assert_well_formed(&complete, &request, 3);
}

#[test]
fn external_fee_at_maximum_is_rejected() {
    let config = RouterConfig::default();
    let snapshot = PoolSnapshot::new(vec![cp("ab", "a", "b", 1000, 1000, 30)]);
    let request = RouteRequest::given_in(coin("a"), coin("b"), BigUint::from(100u32))
        .with_external_fee("0xfee", config.max_external_fee_percentage);

    let err = find_best_route(&config, &snapshot, &request).unwrap_err();
    assert!(matches!(err, RouterError::Configuration(_)));

    let below = request.clone().with_external_fee("0xfee", 0.01);
    assert!(find_best_route(&config, &snapshot, &below).is_ok());
}

#[test]
fn disconnected_coins_have_no_route() {
    let snapshot = PoolSnapshot::new(vec![
        cp("ab", "a", "b", 1000, 1000, 30),
        cp("cd", "c", "d", 1000, 1000, 30),
    ]);
    let request = RouteRequest::given_in(coin("a"), coin("d"), BigUint::from(100u32));

    let err = find_best_route(&RouterConfig::default(), &snapshot, &request).unwrap_err();
    assert_eq!(
        err,
        RouterError::NoRoute {
            coin_in: coin("a"),
            coin_out: coin("d")
        }
    );
}

#[test]
fn shallow_order_book_is_skipped_without_partial_fill() {
    let config = config_with_partitions(1);
    let request = RouteRequest::given_in(coin("a"), coin("b"), BigUint::from(1_000u32));

    let only_book = PoolSnapshot::new(vec![book("book", "a", "b", 100)]);
    let err = find_best_route(&config, &only_book, &request).unwrap_err();
    assert!(matches!(err, RouterError::NoRoute { .. }));

    let with_pool = PoolSnapshot::new(vec![
        book("book", "a", "b", 100),
        cp("ab", "a", "b", 1_000_000, 1_000_000, 30),
    ]);
    let complete = find_best_route(&config, &with_pool, &request).unwrap();
    assert_eq!(complete.routes.len(), 1);
    assert_eq!(complete.routes[0].legs[0].pool_id, "ab");
    assert_well_formed(&complete, &request, 3);
}

#[test]
fn shallow_order_book_shares_the_trade_within_its_depth() {
    let snapshot = PoolSnapshot::new(vec![
        book("book", "a", "b", 100),
        cp("ab", "a", "b", 1_000_000, 1_000_000, 30),
    ]);
    let request = RouteRequest::given_in(coin("a"), coin("b"), BigUint::from(1_000u32));

    let complete = find_best_route(&RouterConfig::default(), &snapshot, &request).unwrap();
    assert_well_formed(&complete, &request, 3);
    assert_eq!(complete.routes.len(), 2);

    let book_leg = complete
        .routes
        .iter()
        .flat_map(|route| &route.legs)
        .find(|leg| leg.pool_id == "book")
        .unwrap();
    // the book takes whole increments until the next one would overrun it
    assert_eq!(book_leg.coin_in.amount, BigUint::from(90u32));
    assert_eq!(book_leg.coin_out.amount, book_leg.coin_in.amount);
}

#[test]
fn stake_above_minimum_routes_with_default_partitions() {
    let snapshot = PoolSnapshot::new(vec![PoolEntry::new(
        "stake",
        "staking",
        Pool::LiquidStaking(LiquidStakingPool::new(
            coin("sui"),
            coin("st"),
            ONE(),
            BigUint::from(500u32),
            0,
            BigUint::from(1_000_000u32),
        )),
    )]);
    let config = RouterConfig::default();

    let request = RouteRequest::given_in(coin("sui"), coin("st"), BigUint::from(1_000u32));
    let complete = find_best_route(&config, &snapshot, &request).unwrap();
    assert_well_formed(&complete, &request, 3);
    assert_eq!(complete.coin_out.amount, BigUint::from(1_000u32));

    let too_small = RouteRequest::given_in(coin("sui"), coin("st"), BigUint::from(400u32));
    assert!(matches!(
        find_best_route(&config, &snapshot, &too_small),
        Err(RouterError::NoRoute { .. })
    ));
}

#[test]
fn increments_too_small_to_price_are_carried_forward() {
    let snapshot = PoolSnapshot::new(vec![cp("thin", "a", "b", 1_000_000, 1_000, 0)]);
    let request = RouteRequest::given_in(coin("a"), coin("b"), BigUint::from(7_500u32));

    let complete = find_best_route(&RouterConfig::default(), &snapshot, &request).unwrap();
    assert_well_formed(&complete, &request, 3);
    // same as one swap of the whole amount
    assert_eq!(complete.coin_out.amount, BigUint::from(7u32));
}

#[test]
fn finer_partitions_never_do_worse() {
    let snapshot = PoolSnapshot::new(vec![
        cp("small", "a", "b", 1000, 1000, 0),
        cp("large", "a", "b", 3000, 3000, 0),
    ]);
    let request = RouteRequest::given_in(coin("a"), coin("b"), BigUint::from(400u32));

    let outputs: Vec<BigUint> = [1, 2, 4, 8]
        .iter()
        .map(|&partitions| {
            find_best_route(&config_with_partitions(partitions), &snapshot, &request)
                .unwrap()
                .coin_out
                .amount
        })
        .collect();

    assert_eq!(outputs[0], BigUint::from(352u32));
    assert_eq!(outputs[2], BigUint::from(362u32));
    for pair in outputs.windows(2) {
        assert!(pair[1] >= pair[0], "{:?}", outputs);
    }
}

#[test]
fn given_out_buys_exactly_the_requested_amount() {
    let snapshot = PoolSnapshot::new(vec![
        cp("ab", "a", "b", 1_000_000, 1_000_000, 30),
        cp("ac", "a", "c", 1_000_000, 1_000_000, 30),
        cp("cb", "c", "b", 1_000_000, 1_000_000, 30),
    ]);
    let request = RouteRequest::given_out(coin("a"), coin("b"), BigUint::from(50_000u32))
        .with_external_fee("0xfee", 0.001)
        .with_referrer("0xref");

    let complete = find_best_route(&RouterConfig::default(), &snapshot, &request).unwrap();
    assert_well_formed(&complete, &request, 3);
    assert_eq!(complete.direction, Direction::GivenOut);
    assert_eq!(complete.referrer.as_deref(), Some("0xref"));
    assert!(complete.coin_in.fee > BigUint::from(0u32));

    // both the direct pool and the two-hop path take part of the trade
    assert_eq!(complete.routes.len(), 2);
}

#[test]
fn hop_limit_from_request_is_respected() {
    let snapshot = PoolSnapshot::new(vec![
        cp("ab", "a", "b", 1_000_000, 1_000_000, 30),
        cp("bc", "b", "c", 1_000_000, 1_000_000, 30),
        cp("cd", "c", "d", 1_000_000, 1_000_000, 30),
    ]);
    let request = RouteRequest::given_in(coin("a"), coin("d"), BigUint::from(1_000u32));

    let complete = find_best_route(&RouterConfig::default(), &snapshot, &request).unwrap();
    assert_eq!(complete.routes[0].legs.len(), 3);

    let limited = request.with_max_hops(2);
    assert!(matches!(
        find_best_route(&RouterConfig::default(), &snapshot, &limited),
        Err(RouterError::NoRoute { .. })
    ));
}

#[test]
fn random_markets_produce_well_formed_routes() {
    let mut rng = StdRng::seed_from_u64(7);
    let coins = ["a", "b", "c", "d", "e"];

    for round in 0..20 {
        let mut pools = Vec::new();
        for i in 0..10 {
            let x = rng.gen_range(0..coins.len());
            let y = (x + rng.gen_range(1..coins.len())) % coins.len();
            let id = format!("p{round}_{i}");
            if rng.gen_bool(0.2) {
                pools.push(book(&id, coins[x], coins[y], rng.gen_range(1_000..100_000)));
            } else {
                pools.push(cp(
                    &id,
                    coins[x],
                    coins[y],
                    rng.gen_range(100_000..10_000_000),
                    rng.gen_range(100_000..10_000_000),
                    rng.gen_range(0..100),
                ));
            }
        }
        let snapshot = PoolSnapshot::new(pools);

        let x = rng.gen_range(0..coins.len());
        let y = (x + rng.gen_range(1..coins.len())) % coins.len();
        let amount = BigUint::from(rng.gen_range(1_000u64..50_000));
        let request = if rng.gen_bool(0.5) {
            RouteRequest::given_in(coin(coins[x]), coin(coins[y]), amount)
        } else {
            RouteRequest::given_out(coin(coins[x]), coin(coins[y]), amount)
        };
        let config = config_with_partitions(rng.gen_range(1..30));

        match find_best_route(&config, &snapshot, &request) {
            Ok(complete) => assert_well_formed(&complete, &request, config.max_hops),
            Err(err) => assert!(matches!(err, RouterError::NoRoute { .. }), "{err}"),
        }
    }
}

#[test]
fn apply_then_revert_restores_every_pool_kind() {
    let mut rng = StdRng::seed_from_u64(11);
    let native = coin("sui");
    let staked = coin("st");

    for _ in 0..25 {
        let balance = |rng: &mut StdRng| BigUint::from(rng.gen_range(1_000_000u64..1_000_000_000));
        let pools = [
            (
                Pool::ConstantProduct(ConstantProductPool::new(
                    coin("a"),
                    coin("b"),
                    balance(&mut rng),
                    balance(&mut rng),
                    30,
                )),
                coin("a"),
                coin("b"),
            ),
            (
                Pool::Stable(StablePool::new(
                    vec![
                        StableCoin::new(
                            coin("a"),
                            BigUint::from(rng.gen_range(100_000_000u64..200_000_000)),
                            BigUint::from(1u32),
                        ),
                        StableCoin::new(
                            coin("b"),
                            BigUint::from(rng.gen_range(100_000_000u64..200_000_000)),
                            BigUint::from(1u32),
                        ),
                    ],
                    100,
                    4,
                )),
                coin("b"),
                coin("a"),
            ),
            (
                Pool::Weighted(WeightedPool::new(
                    vec![
                        WeightedCoin::new(
                            coin("a"),
                            BigUint::from(rng.gen_range(1_000_000u64..10_000_000)),
                            ONE() * 4u32 / 5u32,
                        ),
                        WeightedCoin::new(coin("b"), balance(&mut rng), ONE() / 5u32),
                    ],
                    coin("lp"),
                    BigUint::from(1_000_000_000u64),
                )),
                coin("a"),
                coin("lp"),
            ),
            (
                Pool::LiquidStaking(LiquidStakingPool::new(
                    native.clone(),
                    staked.clone(),
                    ONE() * 9u32 / 10u32,
                    BigUint::from(1u32),
                    20,
                    balance(&mut rng) * 1_000u32,
                )),
                staked.clone(),
                native.clone(),
            ),
        ];

        for (pool, coin_in, coin_out) in pools {
            let amount_in = BigUint::from(rng.gen_range(1_000u64..100_000));
            let amount_out = pool.trade_amount_out(&coin_in, &amount_in, &coin_out).unwrap();
            let traded = pool
                .apply_trade(&coin_in, &amount_in, &coin_out, &amount_out)
                .unwrap();
            assert_ne!(traded, pool);
            let restored = traded
                .revert_trade(&coin_in, &amount_in, &coin_out, &amount_out)
                .unwrap();
            assert_eq!(restored, pool);
        }
    }
}

#[test]
fn routes_from_a_snapshot_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pools.json");
    let snapshot = PoolSnapshot::new(vec![
        cp("ab", "a", "b", 1_000_000, 2_000_000, 30),
        book("book", "a", "b", 1_000_000),
    ]);
    write_snapshot_on_disk(&path, &snapshot).unwrap();

    let loaded = read_snapshot_from_disk(&path).unwrap();
    let request = RouteRequest::given_in(coin("a"), coin("b"), BigUint::from(10_000u32));
    let complete = find_best_route(&RouterConfig::default(), &loaded, &request).unwrap();
    assert_well_formed(&complete, &request, 3);

    let json = serde_json::to_string(&complete).unwrap();
    assert!(json.contains("\"GIVEN_IN\""));
}

#[tokio::test]
async fn worker_serves_requests() {
    let handle = spawn_router_worker(RouterConfig::default());
    let snapshot = Arc::new(PoolSnapshot::new(vec![cp("ab", "a", "b", 1_000_000, 1_000_000, 30)]));
    let request = RouteRequest::given_in(coin("a"), coin("b"), BigUint::from(1_000u32));

    let from_worker = handle
        .find_best_route(snapshot.clone(), request.clone())
        .await
        .unwrap();
    let direct = find_best_route(&RouterConfig::default(), &snapshot, &request).unwrap();
    assert_eq!(from_worker, direct);
}
