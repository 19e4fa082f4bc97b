//! Transport abstraction for the remote API
//!
//! The client is written against a small send-bytes/receive-bytes trait so
//! tests can script responses without a network. The production
//! implementation POSTs over HTTPS with reqwest (rustls).

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::constants::USER_AGENT;
use crate::error::Error;

//==============================================================================
// Trait
//==============================================================================

/// Synchronous request/response byte transport.
///
/// `send` returns the HTTP status code and the raw response body. An error
/// status is NOT a transport failure: whenever the service produced a
/// response, status and body are handed to the caller, which decides how to
/// interpret them. Only connection-level problems are errors here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, payload: &[u8]) -> Result<(u16, Vec<u8>), Error>;
}

//==============================================================================
// HTTP implementation
//==============================================================================

/// POSTs payloads to a fixed endpoint URL.
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// The timeout covers connect and full response; the API is a slow,
    /// low-traffic administrative service, so generous values (minutes)
    /// are appropriate.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Network(format!("build HTTP client: {e}")))?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: &[u8]) -> Result<(u16, Vec<u8>), Error> {
        debug!("POST {} ({} bytes)", self.url, payload.len());
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/xml")
            .header("Content-Length", payload.len().to_string())
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| Error::Network(format!("POST failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("read response body: {e}")))?;
        debug!("status {} ({} bytes)", status, body.len());
        Ok((status, body.to_vec()))
    }
}
