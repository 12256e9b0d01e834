//! Gateway Router

use std::sync::Arc;

use axum::Router;
use platform::background::BackgroundTasks;
use platform::kv::KeyValueStore;

use crate::application::config::GatewayConfig;
use crate::domain::repository::{ResponseCache, UpstreamClient};
use crate::presentation::handlers::{self, GatewayAppState};

/// Create the gateway router; every method and path is proxied
pub fn gateway_router<S, C, U>(
    store: S,
    cache: C,
    upstream: U,
    config: GatewayConfig,
    tasks: BackgroundTasks,
) -> Router
where
    S: KeyValueStore + Send + Sync + 'static,
    C: ResponseCache + Send + Sync + 'static,
    U: UpstreamClient + Send + Sync + 'static,
{
    let state = GatewayAppState {
        store: Arc::new(store),
        cache: Arc::new(cache),
        upstream: Arc::new(upstream),
        config: Arc::new(config),
        tasks,
    };

    Router::new()
        .fallback(handlers::proxy::<S, C, U>)
        .with_state(state)
}
