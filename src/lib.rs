pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod types;
pub mod worker;

pub use crate::core::snapshot::{PoolEntry, PoolSnapshot};
pub use crate::core::types::{CoinType, CompleteTradeRoute, Direction, ExternalFee};
pub use error::RouterError;
pub use orchestrator::find_best_route;
pub use types::{RouteRequest, RouterConfig};
pub use worker::{spawn_router_worker, RouterHandle};
