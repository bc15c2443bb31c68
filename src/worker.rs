use super::core::snapshot::PoolSnapshot;
use super::core::types::CompleteTradeRoute;
use super::error::RouterError;
use super::orchestrator::find_best_route;
use super::types::{RouteRequest, RouterConfig};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;
use tracing::{info, warn};

enum RouterRequest {
    FindRoute {
        snapshot: Arc<PoolSnapshot>,
        request: RouteRequest,
        response_tx: oneshot::Sender<Result<CompleteTradeRoute, RouterError>>,
    },
}

/// Cheap, cloneable handle to a routing thread.
///
/// Requests are served one at a time in arrival order. Dropping the future
/// returned by [`RouterHandle::find_best_route`] abandons the answer.
#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<RouterRequest>,
}

impl RouterHandle {
    pub async fn find_best_route(
        &self,
        snapshot: Arc<PoolSnapshot>,
        request: RouteRequest,
    ) -> Result<CompleteTradeRoute, RouterError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(RouterRequest::FindRoute {
                snapshot,
                request,
                response_tx,
            })
            .map_err(|_| RouterError::WorkerUnavailable("router thread has shut down".to_string()))?;

        response_rx.await.map_err(|_| {
            RouterError::WorkerUnavailable("router thread dropped the request".to_string())
        })?
    }
}

/// Spawn the routing thread. It exits once every handle is dropped.
pub fn spawn_router_worker(config: RouterConfig) -> RouterHandle {
    let (tx, rx) = mpsc::channel::<RouterRequest>();

    thread::spawn(move || {
        info!("router worker started");
        while let Ok(message) = rx.recv() {
            match message {
                RouterRequest::FindRoute {
                    snapshot,
                    request,
                    response_tx,
                } => {
                    let result = find_best_route(&config, &snapshot, &request);
                    if response_tx.send(result).is_err() {
                        warn!("route requester went away before the answer was ready");
                    }
                }
            }
        }
        info!("router worker stopped");
    });

    RouterHandle { tx }
}
