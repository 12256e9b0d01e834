//! Process Settings
//!
//! Reads the environment once at startup into a `GatewayConfig` plus the
//! server and storage options the binary needs.

use std::fmt::Display;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use gateway::{EndpointLimitTable, GatewayConfig};
use platform::rate_limit::RateLimitConfig;

/// Everything loaded from the environment
#[derive(Debug)]
pub struct Settings {
    pub gateway: GatewayConfig,
    /// Postgres for shared quotas; in-memory store when absent
    pub database_url: Option<String>,
    pub cache_max_entries: u64,
    pub host: IpAddr,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = GatewayConfig::default();
        let vars = Vars(lookup);

        let api_key = vars
            .string("UPSTREAM_API_KEY")
            .context("UPSTREAM_API_KEY must be set in environment")?;

        let client_rate_limit = vars.tier("CLIENT", defaults.client_rate_limit)?;
        let server_rate_limit = vars.tier("SERVER", defaults.server_rate_limit)?;

        let client_rate_limit_multiplier: f64 = vars.parse_or(
            "CLIENT_RATE_LIMIT_MULTIPLIER",
            defaults.client_rate_limit_multiplier,
        )?;
        if !(client_rate_limit_multiplier.is_finite() && client_rate_limit_multiplier >= 0.0) {
            bail!("CLIENT_RATE_LIMIT_MULTIPLIER must be a non-negative number");
        }

        let endpoint_limits = match vars.string("RATE_LIMITS_FILE") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read RATE_LIMITS_FILE={path}"))?;
                EndpointLimitTable::from_json(&raw)
                    .with_context(|| format!("invalid RATE_LIMITS_FILE={path}"))?
            }
            None => EndpointLimitTable::default(),
        };

        let cache_secs = vars.parse_or("CACHE_DURATION", defaults.cache_max_age.as_secs())?;

        let gateway = GatewayConfig {
            api_key,
            api_key_header: vars.string_or("UPSTREAM_API_KEY_HEADER", defaults.api_key_header),
            user_agent: vars.string_or("UPSTREAM_USER_AGENT", defaults.user_agent),
            default_region: vars.string_or("DEFAULT_REGION", defaults.default_region),
            upstream_base_domain: vars
                .string_or("UPSTREAM_BASE_DOMAIN", defaults.upstream_base_domain),
            upstream_scheme: vars.string_or("UPSTREAM_SCHEME", defaults.upstream_scheme),
            client_ip_header: vars.string_or("CLIENT_IP_HEADER", defaults.client_ip_header),
            cache_max_age: Duration::from_secs(cache_secs),
            client_rate_limit,
            server_rate_limit,
            client_rate_limit_multiplier,
            endpoint_limits,
        };

        Ok(Self {
            gateway,
            database_url: vars.string("DATABASE_URL"),
            cache_max_entries: vars.parse_or("CACHE_MAX_ENTRIES", 10_000)?,
            host: vars.parse_or("HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: vars.parse_or("PORT", 31113)?,
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value of `name`
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string_or(&self, name: &str, default: String) -> String {
        self.string(name).unwrap_or(default)
    }

    fn parse_or<T>(&self, name: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.string(name) {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid {name}={raw}: {e}")),
            None => Ok(default),
        }
    }

    /// `<TIER>_RATE_LIMIT_BURST` and `<TIER>_RATE_LIMIT_INTERVAL`
    fn tier(&self, tier: &str, default: RateLimitConfig) -> anyhow::Result<RateLimitConfig> {
        let burst_var = format!("{tier}_RATE_LIMIT_BURST");
        let interval_var = format!("{tier}_RATE_LIMIT_INTERVAL");

        let burst: u32 = self.parse_or(&burst_var, default.burst)?;
        let interval_secs: u64 = self.parse_or(&interval_var, default.interval.as_secs())?;

        if burst == 0 {
            bail!("{burst_var} must be greater than zero");
        }
        if interval_secs == 0 {
            bail!("{interval_var} must be greater than zero");
        }

        Ok(RateLimitConfig::new(burst, interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = load(&[("UPSTREAM_API_KEY", "RGAPI-x")]).unwrap();

        assert_eq!(settings.gateway.api_key, "RGAPI-x");
        assert_eq!(settings.gateway.default_region, "na1");
        assert_eq!(settings.gateway.cache_max_age, Duration::from_secs(60));
        assert_eq!(settings.gateway.client_rate_limit, RateLimitConfig::new(20, 1));
        assert_eq!(settings.gateway.server_rate_limit, RateLimitConfig::new(100, 120));
        assert!(settings.gateway.endpoint_limits.is_empty());
        assert!(settings.database_url.is_none());
        assert_eq!(settings.port, 31113);
        assert_eq!(settings.cache_max_entries, 10_000);
    }

    #[test]
    fn test_overrides() {
        let settings = load(&[
            ("UPSTREAM_API_KEY", "RGAPI-x"),
            ("DEFAULT_REGION", "euw1"),
            ("CACHE_DURATION", "300"),
            ("CLIENT_RATE_LIMIT_BURST", "5"),
            ("CLIENT_RATE_LIMIT_INTERVAL", "60"),
            ("CLIENT_IP_HEADER", "X-Real-IP"),
            ("DATABASE_URL", "postgres://localhost/gateway"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(settings.gateway.default_region, "euw1");
        assert_eq!(settings.gateway.cache_max_age, Duration::from_secs(300));
        assert_eq!(settings.gateway.client_rate_limit, RateLimitConfig::new(5, 60));
        assert_eq!(settings.gateway.client_ip_header, "X-Real-IP");
        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/gateway"));
        assert_eq!(settings.host, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn test_api_key_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("UPSTREAM_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_zero_burst_or_interval_rejected() {
        let err = load(&[("UPSTREAM_API_KEY", "k"), ("SERVER_RATE_LIMIT_BURST", "0")]).unwrap_err();
        assert!(err.to_string().contains("SERVER_RATE_LIMIT_BURST"));

        let err = load(&[("UPSTREAM_API_KEY", "k"), ("CLIENT_RATE_LIMIT_INTERVAL", "0")]).unwrap_err();
        assert!(err.to_string().contains("CLIENT_RATE_LIMIT_INTERVAL"));
    }

    #[test]
    fn test_unparsable_value_rejected() {
        let err = load(&[("UPSTREAM_API_KEY", "k"), ("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    fn write_table(name: &str, json: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{name}-{}.json", std::process::id()));
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_rate_limits_file_loaded() {
        let path = write_table(
            "gateway-limits-ok",
            r#"{"rateLimits":[{"method":"GET","path":"/lol/status/v4/platform-data","burst":30,"interval":10}]}"#,
        );
        let settings = load(&[
            ("UPSTREAM_API_KEY", "k"),
            ("RATE_LIMITS_FILE", path.to_str().unwrap()),
        ])
        .unwrap();

        assert!(!settings.gateway.endpoint_limits.is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_zero_endpoint_limit_aborts_startup() {
        let path = write_table(
            "gateway-limits-zero",
            r#"{"rateLimits":[{"method":"GET","path":"/lol/status/v4/platform-data","burst":0,"interval":0}]}"#,
        );
        let err = load(&[
            ("UPSTREAM_API_KEY", "k"),
            ("RATE_LIMITS_FILE", path.to_str().unwrap()),
        ])
        .unwrap_err();

        assert!(err.to_string().contains("RATE_LIMITS_FILE"));
        assert!(format!("{err:#}").contains("burst must be greater than zero"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_rate_limits_file_rejected() {
        let err = load(&[
            ("UPSTREAM_API_KEY", "k"),
            ("RATE_LIMITS_FILE", "/nonexistent/rate-limits.json"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("RATE_LIMITS_FILE"));
    }
}
