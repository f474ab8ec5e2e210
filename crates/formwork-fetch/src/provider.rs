//! The fetch provider contract and its reqwest reference implementation.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use formwork_types::{DataSource, FormworkError, Result};

// ---------------------------------------------------------------------------
// FetchProvider
// ---------------------------------------------------------------------------

/// The injected collaborator that dispatches a [`DataSource`]. Implementations
/// must fail on non-2xx responses with the parsed response body as the error
/// payload; the engine never inspects transport details beyond that.
#[async_trait]
pub trait FetchProvider: Send + Sync {
    async fn fetch(&self, source: &DataSource) -> Result<Value>;
}

// ---------------------------------------------------------------------------
// HttpFetchProvider
// ---------------------------------------------------------------------------

/// Reqwest-backed provider. A base URL may be configured so the relative URLs
/// common in schema documents resolve against the host application's origin.
pub struct HttpFetchProvider {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpFetchProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Some(base_url.into()),
        }
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.contains("://") {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url.to_string(),
        }
    }
}

impl Default for HttpFetchProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchProvider for HttpFetchProvider {
    async fn fetch(&self, source: &DataSource) -> Result<Value> {
        let url = self.absolute_url(&source.url);
        let method = source
            .method
            .as_deref()
            .and_then(|m| m.parse::<Method>().ok())
            .unwrap_or(Method::GET);

        let mut request = self.client.request(method, &url);

        if let Some(headers) = &source.headers {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), value);
                }
            }
        }

        if let Some(body) = &source.body {
            // A body that fails to serialize degrades to "send no body":
            // the request still goes out, without the JSON content type.
            match serde_json::to_string(body) {
                Ok(json) => {
                    request = request
                        .header(reqwest::header::CONTENT_TYPE, "application/json")
                        .body(json);
                }
                Err(err) => {
                    warn!(url = %url, error = %err, "request body failed to serialize, sending without body");
                }
            }
        }

        debug!(url = %url, "dispatching data source");
        let response = request.send().await.map_err(|err| FormworkError::Transport {
            url: url.clone(),
            message: err.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(FormworkError::FetchStatus {
                url,
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().await.map_err(|err| FormworkError::Transport {
            url,
            message: format!("invalid JSON response: {err}"),
        })
    }
}
