use crate::core::types::CoinType;

/// Errors surfaced by the public routing entry points.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouterError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("no route from {coin_in} to {coin_out}")]
    NoRoute { coin_in: CoinType, coin_out: CoinType },
    #[error("router worker unavailable: {0}")]
    WorkerUnavailable(String),
}

impl RouterError {
    pub fn configuration(message: impl Into<String>) -> Self {
        RouterError::Configuration(message.into())
    }

    pub fn no_route(coin_in: &CoinType, coin_out: &CoinType) -> Self {
        RouterError::NoRoute {
            coin_in: coin_in.clone(),
            coin_out: coin_out.clone(),
        }
    }
}
