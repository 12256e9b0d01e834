//! Upstream HTTP Client (reqwest)

use axum::http::{HeaderMap, header};

use crate::domain::entities::{UpstreamRequest, UpstreamResponse};
use crate::domain::repository::{UpstreamClient, UpstreamError};

/// Headers describing the upstream connection rather than the payload
static HOP_BY_HOP: [header::HeaderName; 4] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
    header::HeaderName::from_static("keep-alive"),
];

/// Upstream client backed by a pooled `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestUpstreamClient {
    client: reqwest::Client,
}

impl ReqwestUpstreamClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client with reqwest's default settings; no request timeout is set
    pub fn from_defaults() -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self::new(client))
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

impl UpstreamClient for ReqwestUpstreamClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Body(e.to_string()))?;

        Ok(UpstreamResponse::new(status, headers, body))
    }
}
