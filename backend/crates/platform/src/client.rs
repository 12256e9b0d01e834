//! Client identification utilities
//!
//! The gateway sits behind a trusted edge that stamps the connecting
//! address into a header (e.g. `CF-Connecting-IP`). That header is the only
//! accepted source of client identity.

use axum::http::HeaderMap;

/// Default trusted header carrying the connecting client address
pub const DEFAULT_CLIENT_IP_HEADER: &str = "CF-Connecting-IP";

/// Error when extracting the client address
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientIpError {
    #[error("Missing required header: {0}")]
    MissingHeader(String),
}

/// Extract client IP address from the trusted header
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `header_name` - Name of the trusted connecting-IP header
///
/// ## Returns
/// * `Ok(String)` - Trimmed header value
/// * `Err(ClientIpError)` - Header absent, empty or not visible ASCII
pub fn extract_client_ip(headers: &HeaderMap, header_name: &str) -> Result<String, ClientIpError> {
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ClientIpError::MissingHeader(header_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_client_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static(" 203.0.113.7 "));

        let ip = extract_client_ip(&headers, DEFAULT_CLIENT_IP_HEADER).unwrap();
        assert_eq!(ip, "203.0.113.7");
    }

    #[test]
    fn test_extract_client_ip_ipv6() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("2001:db8::1"));

        let ip = extract_client_ip(&headers, "X-Real-IP").unwrap();
        assert_eq!(ip, "2001:db8::1");
    }

    #[test]
    fn test_extract_client_ip_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );

        let result = extract_client_ip(&headers, DEFAULT_CLIENT_IP_HEADER);
        assert!(matches!(result, Err(ClientIpError::MissingHeader(h)) if h == "CF-Connecting-IP"));
    }

    #[test]
    fn test_extract_client_ip_empty() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("  "));

        assert!(extract_client_ip(&headers, DEFAULT_CLIENT_IP_HEADER).is_err());
    }
}
