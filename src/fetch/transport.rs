//! HTTP transport used by the fetch orchestrator
//!
//! This module handles the raw request/response exchange, including:
//! - Building one HTTP client per proxy address (plus one for direct mode)
//! - Issuing GET requests with a per-request user agent and timeout
//! - Classifying network errors into connection, timeout and other failures
//!
//! Non-2xx responses are not errors here; the orchestrator decides what a
//! status code means for the proxy that served it.

use async_trait::async_trait;
use reqwest::{header, Client, Proxy};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// One outbound request
#[derive(Debug, Clone)]
pub struct TransportRequest<'a> {
    pub url: &'a str,
    /// `host:port` of the relay to route through; `None` connects directly
    pub proxy: Option<&'a str>,
    pub user_agent: &'a str,
    pub timeout: Duration,
}

/// Response as received, whatever its status
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network-level failure of a single request
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Other(String),
}

/// Sends a single request and returns the raw response
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        request: &TransportRequest<'_>,
    ) -> Result<TransportResponse, TransportError>;

    /// Drops any state held for a proxy that will not be used again
    fn release(&self, _proxy: &str) {}
}

/// reqwest-backed transport with a client cached per proxy
#[derive(Default)]
pub struct ReqwestTransport {
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<Client, TransportError> {
        let key = proxy.map(str::to_string);
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = build_http_client(proxy).map_err(|e| TransportError::Other(e.to_string()))?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

/// Builds an HTTP client, optionally routed through `proxy`
///
/// # Arguments
///
/// * `proxy` - `host:port` of an HTTP relay, or `None` for a direct client
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(address) = proxy {
        builder = builder.proxy(Proxy::all(format!("http://{}", address))?);
    }

    builder.build()
}

fn classify(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connection(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        request: &TransportRequest<'_>,
    ) -> Result<TransportResponse, TransportError> {
        let client = self.client_for(request.proxy)?;

        let response = client
            .get(request.url)
            .header(header::USER_AGENT, request.user_agent)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| classify(&e))?;

        Ok(TransportResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }

    fn release(&self, proxy: &str) {
        let key = Some(proxy.to_string());
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }
}
