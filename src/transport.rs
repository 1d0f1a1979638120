//! Transport to the configuration service.
//!
//! The retrieval pipeline only knows the [`Transport`] trait. The crate
//! ships [`HttpTransport`], which talks to the hosted service over HTTPS;
//! tests and embedders can plug in anything else.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::TransportError;

/// Base URL of the hosted configuration service.
pub const DEFAULT_API_URL: &str = "https://api.sconfig.io";

/// Request timeout applied by [`HttpTransport`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Code used when the service fails without saying why.
pub const SERVER_ERROR_CODE: &str = "SERVER_ERROR";

/// Fetches raw configuration payloads.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the payload for `key`, optionally pinned to `version`.
    ///
    /// Returns the body exactly as delivered (possibly still encrypted).
    async fn fetch(&self, key: &str, version: Option<&str>) -> Result<Vec<u8>, TransportError>;
}

/// HTTPS transport for the hosted service.
///
/// Sends `GET {base}/config[?v=version]` with a bearer token. Redirects are
/// not followed.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Transport for [`DEFAULT_API_URL`].
    pub fn new() -> Result<Self, TransportError> {
        Self::with_base_url(DEFAULT_API_URL)
    }

    /// Transport for a self-hosted or test endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sconfig/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(network_error)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the request timeout (default 5 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body to `path` and return the `result` member of the
    /// JSON response (`Null` when absent).
    pub async fn post_json(
        &self,
        key: &str,
        path: &str,
        body: &Value,
    ) -> Result<Value, TransportError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self
            .client
            .post(url)
            .timeout(self.timeout)
            .bearer_auth(key)
            .json(body);
        let bytes = send(builder).await?;
        let response: Value = serde_json::from_slice(&bytes).map_err(|err| {
            TransportError::Server {
                status: None,
                code: SERVER_ERROR_CODE.to_string(),
                message: format!("invalid JSON response: {}", err),
            }
        })?;
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, key: &str, version: Option<&str>) -> Result<Vec<u8>, TransportError> {
        let mut builder = self
            .client
            .get(format!("{}/config", self.base_url))
            .timeout(self.timeout)
            .bearer_auth(key);
        if let Some(version) = version {
            builder = builder.query(&[("v", version)]);
        }
        send(builder).await
    }
}

async fn send(builder: reqwest::RequestBuilder) -> Result<Vec<u8>, TransportError> {
    let response = builder.send().await.map_err(network_error)?;
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(network_error)?;
    if !(200..399).contains(&status) {
        return Err(server_error(status, &body));
    }
    Ok(body.to_vec())
}

fn network_error(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: Option<Value>,
    message: Option<String>,
}

/// Build the error for a non-success response, preferring the service's
/// own `{"error": {"code", "message"}}` when the body carries one.
pub(crate) fn server_error(status: u16, body: &[u8]) -> TransportError {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error);

    let code = detail
        .as_ref()
        .and_then(|d| d.code.as_ref())
        .map(|code| match code {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| SERVER_ERROR_CODE.to_string());
    let message = detail
        .and_then(|d| d.message)
        .unwrap_or_else(|| "SConfig servers are currently unavailable.".to_string());

    TransportError::Server {
        status: Some(status),
        code,
        message,
    }
}
