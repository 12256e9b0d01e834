//! HTTP Handlers

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use platform::background::BackgroundTasks;
use platform::kv::KeyValueStore;

use crate::application::config::GatewayConfig;
use crate::application::proxy_request::{ProxyRequestInput, ProxyRequestUseCase};
use crate::domain::entities::UpstreamResponse;
use crate::domain::repository::{ResponseCache, UpstreamClient};
use crate::error::GatewayResult;

/// Shared state for the proxy handler
pub struct GatewayAppState<S, C, U>
where
    S: KeyValueStore + Send + Sync + 'static,
    C: ResponseCache + Send + Sync + 'static,
    U: UpstreamClient + Send + Sync + 'static,
{
    pub store: Arc<S>,
    pub cache: Arc<C>,
    pub upstream: Arc<U>,
    pub config: Arc<GatewayConfig>,
    pub tasks: BackgroundTasks,
}

impl<S, C, U> Clone for GatewayAppState<S, C, U>
where
    S: KeyValueStore + Send + Sync + 'static,
    C: ResponseCache + Send + Sync + 'static,
    U: UpstreamClient + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            upstream: self.upstream.clone(),
            config: self.config.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

/// ANY /*
pub async fn proxy<S, C, U>(
    State(state): State<GatewayAppState<S, C, U>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<Response>
where
    S: KeyValueStore + Send + Sync + 'static,
    C: ResponseCache + Send + Sync + 'static,
    U: UpstreamClient + Send + Sync + 'static,
{
    let input = ProxyRequestInput {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
        received_at_ms: Utc::now().timestamp_millis(),
    };

    let use_case = ProxyRequestUseCase::new(
        state.store.clone(),
        state.cache.clone(),
        state.upstream.clone(),
        state.config.clone(),
        state.tasks.clone(),
    );

    let response = use_case.execute(input).await?;

    Ok(response.into_response())
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
