//! Upstream Routing
//!
//! Maps an inbound path onto a regional upstream URL. The first path
//! segment selects the region; unrecognized or missing segments fall back
//! to the configured default region and the path is forwarded unchanged.

use crate::domain::region::Region;
use crate::error::{GatewayError, GatewayResult};

/// Where an inbound request is forwarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRoute {
    pub region: Region,
    /// Path with the region segment removed, always starting with `/`
    pub path: String,
    pub query: Option<String>,
    host: String,
    scheme: String,
}

impl UpstreamRoute {
    /// Resolve the route for an inbound `path` and optional `query`
    ///
    /// ## Errors
    /// `GatewayError::Configuration` when the path names no region and
    /// `default_region` is not a valid region code.
    pub fn resolve(
        path: &str,
        query: Option<&str>,
        default_region: &str,
        scheme: &str,
        base_domain: &str,
    ) -> GatewayResult<Self> {
        let segment = path
            .strip_prefix('/')
            .and_then(|rest| rest.split('/').next())
            .unwrap_or_default();

        let (region, path) = match segment.parse::<Region>() {
            Ok(region) => {
                let rest = &path[segment.len() + 1..];
                let rest = if rest.is_empty() { "/" } else { rest };
                tracing::debug!(region = %region, "Using region from path");
                (region, rest.to_string())
            }
            Err(_) => {
                let region = default_region.parse::<Region>().map_err(|_| {
                    GatewayError::Configuration(format!(
                        "invalid default region: DEFAULT_REGION={default_region}"
                    ))
                })?;
                tracing::debug!(region = %region, "Using default region");
                let path = if path.is_empty() { "/" } else { path };
                (region, path.to_string())
            }
        };

        Ok(Self {
            host: region.host(base_domain),
            scheme: scheme.to_string(),
            region,
            path,
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Fully rewritten upstream URL, also used as the cache key
    pub fn url(&self) -> String {
        match &self.query {
            Some(query) => format!("{}://{}{}?{}", self.scheme, self.host, self.path, query),
            None => format!("{}://{}{}", self.scheme, self.host, self.path),
        }
    }
}
