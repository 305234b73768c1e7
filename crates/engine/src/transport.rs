use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use leadly_core::ProviderId;

/// A fully-built provider HTTP request: method, URL, headers, JSON body.
/// The engine never looks inside vendor payloads after this point.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderRequest {
    pub provider: ProviderId,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

/// What came back at the transport level, before any normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request could not be sent: {0}")]
    Send(String),
    #[error("response body could not be read: {0}")]
    Body(String),
}

/// Provider-agnostic call primitive. Production wraps `reqwest`; tests
/// inject scripted responses and count invocations.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, TransportError>;
}

/// `reqwest`-backed transport with a per-request timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| TransportError::Send(error.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, TransportError> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response =
            builder.send().await.map_err(|error| TransportError::Send(error.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body =
            response.text().await.map_err(|error| TransportError::Body(error.to_string()))?;

        Ok(ProviderResponse { status, retry_after, body })
    }
}
