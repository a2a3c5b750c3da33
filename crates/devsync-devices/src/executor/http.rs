//! HTTP-backed executor.
//!
//! Applies a value by POSTing a JSON payload to a device endpoint:
//!
//! ```json
//! {
//!   "device_id": "…",
//!   "value": { "Integer": 5 },
//!   "config": { "parameter": { "String": "12" } }
//! }
//! ```
//!
//! Success is any 2xx status. If the response body is JSON with a `value`
//! field, it is taken as the value the device actually applied.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use devsync_core::DeviceValue;

use super::{ExecutionError, ExecutionRequest, ExecutionResult, Executor};
use crate::config::FieldValue;

/// Executor that applies values through an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    url: String,
    headers: HashMap<String, String>,
}

impl HttpExecutor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// Add a request header (e.g. authorization).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Use a preconfigured client (connection pooling, TLS settings).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn payload(request: &ExecutionRequest) -> serde_json::Value {
        let config: HashMap<&str, &FieldValue> = request.config.iter().collect();
        serde_json::json!({
            "device_id": request.device_id,
            "value": request.target,
            "config": config,
        })
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn run(&self, request: &ExecutionRequest, timeout: Duration) -> ExecutionResult {
        debug!(device_id = %request.device_id, url = %self.url, "sending value over HTTP");

        let mut http_request = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .json(&Self::payload(request));
        for (key, value) in &self.headers {
            http_request = http_request.header(key, value);
        }

        let response = match http_request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return ExecutionResult::failed(ExecutionError::Timeout);
            }
            Err(e) => {
                return ExecutionResult::failed(ExecutionError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ExecutionResult::failed(ExecutionError::Transport(format!(
                "unexpected status {}",
                status
            )));
        }

        // An adjusted value in the body is optional; anything else is a
        // plain acknowledgement
        let reported = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("value").cloned())
            .and_then(|value| serde_json::from_value::<DeviceValue>(value).ok());

        match reported {
            Some(value) => ExecutionResult::ok_with_value(value),
            None => ExecutionResult::ok(),
        }
    }
}
