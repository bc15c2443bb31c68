use super::constants::{FIXED_ONE, ONE};
use super::pool::to_f64;
use super::types::{CoinAmount, CompleteTradeRoute, Direction, ExternalFee, TradeRoute};
use num_bigint::BigUint;
use num_traits::Zero;

/// Combine the per-route fills into the answer handed to the transaction
/// builder.
///
/// Aggregate amounts are exact sums over the routes. An external fee is
/// reported on the side the caller is charged: the output for given-in
/// trades, the input for given-out trades.
pub fn assemble_complete_route(
    routes: Vec<TradeRoute>,
    direction: Direction,
    referrer: Option<String>,
    external_fee: Option<ExternalFee>,
) -> Option<CompleteTradeRoute> {
    let first = routes.first()?;
    let mut coin_in = CoinAmount::new(first.coin_in.coin_type.clone(), BigUint::zero());
    let mut coin_out = CoinAmount::new(first.coin_out.coin_type.clone(), BigUint::zero());

    for route in &routes {
        coin_in.amount += &route.coin_in.amount;
        coin_out.amount += &route.coin_out.amount;
    }

    let total_in = to_f64(&coin_in.amount);
    let spot_price = if total_in > 0.0 {
        routes
            .iter()
            .map(|route| route.spot_price * to_f64(&route.coin_in.amount) / total_in)
            .sum::<f64>()
    } else {
        0.0
    };

    if let Some(fee) = &external_fee {
        let rate = fee_rate(fee.percentage);
        match direction {
            Direction::GivenIn => coin_out.fee = &coin_out.amount * &rate / ONE(),
            Direction::GivenOut => coin_in.fee = (&coin_in.amount * &rate + ONE() - 1u32) / ONE(),
        }
    }

    Some(CompleteTradeRoute {
        routes,
        coin_in,
        coin_out,
        spot_price,
        direction,
        referrer,
        external_fee,
    })
}

// Fee fraction as 18-decimal fixed point
fn fee_rate(percentage: f64) -> BigUint {
    if !percentage.is_finite() || percentage <= 0.0 {
        return BigUint::zero();
    }
    BigUint::from((percentage * FIXED_ONE as f64) as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CoinType, TradeLeg};

    fn route(amount_in: u32, amount_out: u32, spot_price: f64) -> TradeRoute {
        let coin_in = CoinAmount::new(CoinType::new("0x1::a::A"), BigUint::from(amount_in));
        let coin_out = CoinAmount::new(CoinType::new("0x1::b::B"), BigUint::from(amount_out));
        TradeRoute::from_legs(vec![TradeLeg {
            pool_id: "p".to_string(),
            protocol: "cp".to_string(),
            coin_in,
            coin_out,
            spot_price,
        }])
        .unwrap()
    }

    fn fee(percentage: f64) -> Option<ExternalFee> {
        Some(ExternalFee {
            recipient: "0xfee".to_string(),
            percentage,
        })
    }

    #[test]
    fn sums_amounts_and_blends_price() {
        let complete = assemble_complete_route(
            vec![route(100, 90, 1.0), route(300, 250, 2.0)],
            Direction::GivenIn,
            Some("0xref".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(complete.coin_in.amount, BigUint::from(400u32));
        assert_eq!(complete.coin_out.amount, BigUint::from(340u32));
        assert!((complete.spot_price - 1.75).abs() < 1e-12);
        assert_eq!(complete.referrer.as_deref(), Some("0xref"));
        assert!(complete.coin_out.fee.is_zero());
    }

    #[test]
    fn given_in_fee_is_taken_from_output() {
        let complete =
            assemble_complete_route(vec![route(1000, 999, 1.0)], Direction::GivenIn, None, fee(0.01))
                .unwrap();
        assert_eq!(complete.coin_out.fee, BigUint::from(9u32));
        assert!(complete.coin_in.fee.is_zero());
    }

    #[test]
    fn given_out_fee_is_added_to_input() {
        let complete =
            assemble_complete_route(vec![route(1001, 1000, 1.0)], Direction::GivenOut, None, fee(0.01))
                .unwrap();
        assert_eq!(complete.coin_in.fee, BigUint::from(11u32));
        assert!(complete.coin_out.fee.is_zero());
    }

    #[test]
    fn nothing_to_assemble() {
        assert!(assemble_complete_route(vec![], Direction::GivenIn, None, None).is_none());
    }
}
