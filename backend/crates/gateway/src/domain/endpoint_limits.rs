//! Endpoint Rate Limit Table
//!
//! Read-only lookup of per-endpoint upstream quotas, loaded from a JSON
//! document of the form:
//!
//! ```json
//! { "rateLimits": [
//!     { "method": "GET", "path": "/lol/summoner/v4/summoners/by-name/:summonerName",
//!       "burst": 1600, "interval": 60 }
//! ] }
//! ```
//!
//! Path segments starting with `:` match any single non-empty segment.

use platform::rate_limit::RateLimitConfig;
use serde::Deserialize;

/// Endpoint table load error
#[derive(Debug, thiserror::Error)]
pub enum EndpointLimitError {
    #[error("malformed rate limit table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid rate limit for {method} {path}: {reason}")]
    InvalidEntry {
        method: String,
        path: String,
        reason: &'static str,
    },
}

/// One endpoint quota
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointLimit {
    pub method: String,
    pub path: String,
    pub burst: u32,
    /// Window length in seconds
    pub interval: u64,
}

impl EndpointLimit {
    pub fn config(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.burst, self.interval)
    }

    fn matches(&self, method: &str, path: &str) -> bool {
        if !self.method.eq_ignore_ascii_case(method) {
            return false;
        }

        let mut pattern = self.path.trim_matches('/').split('/');
        let mut actual = path.trim_matches('/').split('/');

        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return true,
                (Some(p), Some(a)) => {
                    let ok = if p.starts_with(':') {
                        !a.is_empty()
                    } else {
                        p == a
                    };
                    if !ok {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

/// Endpoint table, empty when none is configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EndpointLimitTable {
    #[serde(rename = "rateLimits")]
    pub rate_limits: Vec<EndpointLimit>,
}

impl EndpointLimitTable {
    /// Parse and validate a table; every entry needs a non-zero burst and interval
    pub fn from_json(raw: &str) -> Result<Self, EndpointLimitError> {
        let table: Self = serde_json::from_str(raw)?;

        for limit in &table.rate_limits {
            let reason = if limit.burst == 0 {
                "burst must be greater than zero"
            } else if limit.interval == 0 {
                "interval must be greater than zero"
            } else {
                continue;
            };
            return Err(EndpointLimitError::InvalidEntry {
                method: limit.method.clone(),
                path: limit.path.clone(),
                reason,
            });
        }

        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.rate_limits.is_empty()
    }

    /// First entry matching `method` and the region-stripped `path`
    pub fn lookup(&self, method: &str, path: &str) -> Option<&EndpointLimit> {
        self.rate_limits.iter().find(|limit| limit.matches(method, path))
    }
}
