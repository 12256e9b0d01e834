//! Gateway Error Types
//!
//! Every failure of the request pipeline ends here and is turned into a
//! definite HTTP response: quota denials become 429, everything else 500
//! with the error description in a plain-text body.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use platform::client::ClientIpError;
use platform::rate_limit::RateLimiterError;
use thiserror::Error;

use crate::domain::entities::LimitTier;
use crate::domain::repository::{CacheError, UpstreamError};

/// Gateway result type alias
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error variants
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid deployment configuration (e.g. default region)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Trusted connecting-IP header absent
    #[error("Error getting IP address: {0}")]
    MissingClientIp(#[from] ClientIpError),

    /// Client or server quota exhausted
    #[error("Rate limit exceeded")]
    RateLimitExceeded(LimitTier),

    /// Rate limit state could not be read or written
    #[error("rate limiter error: {0}")]
    RateLimiter(#[from] RateLimiterError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Configuration(_)
            | GatewayError::MissingClientIp(_)
            | GatewayError::RateLimiter(_)
            | GatewayError::Cache(_)
            | GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> String {
        match self {
            GatewayError::RateLimitExceeded(_) => self.to_string(),
            _ => format!("Error: {self}"),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            GatewayError::RateLimitExceeded(tier) => {
                tracing::warn!(tier = %tier, "Rate limit exceeded");
            }
            GatewayError::MissingClientIp(e) => {
                tracing::error!(error = %e, "Error getting client IP address");
            }
            GatewayError::Configuration(msg) => {
                tracing::error!(message = %msg, "Gateway configuration error");
            }
            GatewayError::RateLimiter(e) => {
                tracing::error!(error = %e, "Rate limiter failure");
            }
            GatewayError::Cache(e) => {
                tracing::error!(error = %e, "Response cache failure");
            }
            GatewayError::Upstream(e) => {
                tracing::error!(error = %e, "Upstream request failed");
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.body(),
        )
            .into_response()
    }
}
