use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{JsonRpcRequest, JsonRpcResponse};
use crate::error::RpcError;

/// Minimal JSON-RPC 2.0 client over HTTP POST
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Call `method` and decode its `result`
    ///
    /// A `null` result decodes into `Option<T>` as `None`; callers that
    /// require a value should ask for `T` directly.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        log::debug!("→ {} (id {})", method, id);

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        let body: JsonRpcResponse = response.json().await.map_err(|e| {
            if status.is_success() {
                RpcError::Decode(e.to_string())
            } else {
                RpcError::Transport(format!("HTTP {}", status))
            }
        })?;

        if let Some(error) = body.error {
            log::debug!("← {} failed: {} (code {})", method, error.message, error.code);
            return Err(RpcError::Node {
                code: error.code,
                message: error.message,
            });
        }

        let result = body.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| RpcError::Decode(format!("{}: {}", method, e)))
    }
}

/// Parse a hex quantity such as `"0xaa36a7"`
pub fn parse_quantity(quantity: &str) -> Result<u64, RpcError> {
    let digits = quantity
        .strip_prefix("0x")
        .filter(|d| !d.is_empty())
        .ok_or_else(|| RpcError::Decode(format!("invalid quantity '{}'", quantity)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|_| RpcError::Decode(format!("invalid quantity '{}'", quantity)))
}
