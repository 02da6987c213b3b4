//! [`HttpClient`] over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;

use crate::domain::{ProxyError, ProxyResult};
use crate::ports::HttpClient;

/// JSON HTTP client with request and connect timeouts.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> ProxyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(
        &self,
        method: Method,
        url: &str,
        expected_status: u16,
        body: Option<&serde_json::Value>,
    ) -> ProxyResult<serde_json::Value> {
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ProxyError::Wallet(format!("cannot connect to {url}"))
            } else {
                ProxyError::Wallet(format!("{method} {url}: {e}"))
            }
        })?;

        let status = response.status();
        debug!(method = %method, url = %url, status = status.as_u16(), "Wallet responded");

        if status.as_u16() != expected_status {
            let text = response.text().await.unwrap_or_default();
            return Err(ProxyError::Wallet(format!(
                "{method} {url} returned {status}, expected {expected_status}: {text}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Wallet(format!("{method} {url}: {e}")))?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ProxyError::Decode(format!("{method} {url}: invalid json: {e}")))
    }
}
