//! Application Configuration
//!
//! Configuration for the gateway application layer. Built once at startup
//! and shared by every request.

use std::time::Duration;

use platform::client::DEFAULT_CLIENT_IP_HEADER;
use platform::rate_limit::RateLimitConfig;

use crate::domain::endpoint_limits::EndpointLimitTable;
use crate::domain::region::Region;

/// Quotas applied to one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub client: RateLimitConfig,
    pub server: RateLimitConfig,
}

/// Gateway application configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream API key
    pub api_key: String,
    /// Header carrying the API key upstream
    pub api_key_header: String,
    /// User-Agent sent upstream
    pub user_agent: String,
    /// Region used when the path names none; validated per request
    pub default_region: String,
    /// Host suffix appended after `<region>.`
    pub upstream_base_domain: String,
    /// `https` in production
    pub upstream_scheme: String,
    /// Trusted header carrying the connecting client address
    pub client_ip_header: String,
    /// `max-age` for cached responses
    pub cache_max_age: Duration,
    /// Per-client quota
    pub client_rate_limit: RateLimitConfig,
    /// Per-upstream-URL quota
    pub server_rate_limit: RateLimitConfig,
    /// Client share of an endpoint quota
    pub client_rate_limit_multiplier: f64,
    /// Per-endpoint upstream quotas
    pub endpoint_limits: EndpointLimitTable,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_key_header: "X-Riot-Token".to_string(),
            user_agent: concat!("regional-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
            default_region: Region::Na1.as_str().to_string(),
            upstream_base_domain: "api.riotgames.com".to_string(),
            upstream_scheme: "https".to_string(),
            client_ip_header: DEFAULT_CLIENT_IP_HEADER.to_string(),
            cache_max_age: Duration::from_secs(60),
            client_rate_limit: RateLimitConfig::new(20, 1),
            server_rate_limit: RateLimitConfig::new(100, 120),
            client_rate_limit_multiplier: 1.0,
            endpoint_limits: EndpointLimitTable::default(),
        }
    }
}

impl GatewayConfig {
    /// Whether the default region names a known region
    pub fn default_region_is_valid(&self) -> bool {
        self.default_region.parse::<Region>().is_ok()
    }

    /// Quotas for `method` on the region-stripped upstream `path`
    ///
    /// A matching endpoint entry sets the server tier, and the client tier
    /// gets `multiplier` of it over the same interval. Otherwise the
    /// configured tier defaults apply.
    pub fn limits_for(&self, method: &str, path: &str) -> TierLimits {
        match self.endpoint_limits.lookup(method, path) {
            Some(endpoint) => {
                let server = endpoint.config();
                let client_burst =
                    (server.burst as f64 * self.client_rate_limit_multiplier).floor() as u32;
                TierLimits {
                    client: RateLimitConfig {
                        burst: client_burst.max(1),
                        interval: server.interval,
                    },
                    server,
                }
            }
            None => TierLimits {
                client: self.client_rate_limit,
                server: self.server_rate_limit,
            },
        }
    }
}
