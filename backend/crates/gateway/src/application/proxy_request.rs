//! Proxy Request Use Case
//!
//! The per-request pipeline: client IP, route, client quota, server quota,
//! cache, upstream, cache write-back. Quotas are checked before the cache
//! so cache hits still count against both tiers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use platform::background::BackgroundTasks;
use platform::client::extract_client_ip;
use platform::kv::KeyValueStore;
use platform::rate_limit::{RateLimitCheck, RateLimitConfig, RateLimiter};

use crate::application::config::GatewayConfig;
use crate::domain::entities::{LimitTier, UpstreamRequest, UpstreamResponse};
use crate::domain::repository::{ResponseCache, UpstreamClient};
use crate::domain::route::UpstreamRoute;
use crate::error::{GatewayError, GatewayResult};

/// Inbound request as seen by the pipeline
#[derive(Debug, Clone)]
pub struct ProxyRequestInput {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Epoch milliseconds at which the request was received
    pub received_at_ms: i64,
}

/// Proxy Request Use Case
pub struct ProxyRequestUseCase<S, C, U>
where
    S: KeyValueStore + Send + Sync + 'static,
    C: ResponseCache + Send + Sync + 'static,
    U: UpstreamClient + Send + Sync + 'static,
{
    limiter: RateLimiter<S>,
    cache: Arc<C>,
    upstream: Arc<U>,
    config: Arc<GatewayConfig>,
    tasks: BackgroundTasks,
}

impl<S, C, U> ProxyRequestUseCase<S, C, U>
where
    S: KeyValueStore + Send + Sync + 'static,
    C: ResponseCache + Send + Sync + 'static,
    U: UpstreamClient + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        upstream: Arc<U>,
        config: Arc<GatewayConfig>,
        tasks: BackgroundTasks,
    ) -> Self {
        Self {
            limiter: RateLimiter::new(store),
            cache,
            upstream,
            config,
            tasks,
        }
    }

    pub async fn execute(&self, input: ProxyRequestInput) -> GatewayResult<UpstreamResponse> {
        let client_ip = extract_client_ip(&input.headers, &self.config.client_ip_header)?;

        let route = UpstreamRoute::resolve(
            &input.path,
            input.query.as_deref(),
            &self.config.default_region,
            &self.config.upstream_scheme,
            &self.config.upstream_base_domain,
        )?;
        let upstream_url = route.url();
        let limits = self.config.limits_for(input.method.as_str(), &route.path);

        tracing::debug!(
            client_ip = %client_ip,
            region = %route.region,
            upstream_url = %upstream_url,
            "Routing request"
        );

        let client_key = format!("in:{client_ip}:{upstream_url}");
        self.enforce(&client_key, limits.client, input.received_at_ms, LimitTier::Client)
            .await?;

        let server_key = format!("out:{upstream_url}");
        self.enforce(&server_key, limits.server, input.received_at_ms, LimitTier::Server)
            .await?;

        if let Some(cached) = self.cache.lookup(&upstream_url).await? {
            tracing::info!(upstream_url = %upstream_url, "Serving cached response");
            return Ok(cached);
        }

        let request = UpstreamRequest {
            method: input.method,
            url: upstream_url.clone(),
            headers: self.upstream_headers()?,
            body: input.body,
        };
        let mut response = self.upstream.send(request).await?;

        tracing::info!(
            upstream_url = %upstream_url,
            status = response.status.as_u16(),
            "Upstream responded"
        );

        if response.is_cacheable() {
            let mut cached = response.clone();
            cached.mark_cached(self.config.cache_max_age, true);
            response.mark_cached(self.config.cache_max_age, false);

            let cache = self.cache.clone();
            self.tasks.spawn("cache_put", async move {
                if let Err(e) = cache.store(&upstream_url, cached).await {
                    tracing::warn!(error = %e, upstream_url = %upstream_url, "Failed to cache response");
                }
            });
        }

        Ok(response)
    }

    async fn enforce(
        &self,
        key: &str,
        config: RateLimitConfig,
        request_timestamp_ms: i64,
        tier: LimitTier,
    ) -> GatewayResult<()> {
        let check = RateLimitCheck {
            key,
            config,
            request_timestamp_ms,
        };

        if self.limiter.is_allowed(&check).await? {
            Ok(())
        } else {
            Err(GatewayError::RateLimitExceeded(tier))
        }
    }

    fn upstream_headers(&self) -> GatewayResult<HeaderMap> {
        let key_header = HeaderName::from_bytes(self.config.api_key_header.as_bytes())
            .map_err(|e| GatewayError::Configuration(format!("invalid API key header name: {e}")))?;
        let key_value = HeaderValue::from_str(&self.config.api_key)
            .map_err(|e| GatewayError::Configuration(format!("invalid API key: {e}")))?;
        let user_agent = HeaderValue::from_str(&self.config.user_agent)
            .map_err(|e| GatewayError::Configuration(format!("invalid user agent: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(key_header, key_value);
        headers.insert(header::USER_AGENT, user_agent);
        Ok(headers)
    }
}
