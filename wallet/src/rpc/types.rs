use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// `eth_sendTransaction` parameter object
#[derive(Debug, Serialize)]
pub struct TransactionObject {
    pub from: String,
    pub to: String,
    /// Hex quantity in wei
    pub value: String,
}

/// Subset of `eth_getTransactionReceipt` used for confirmation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    /// `None` while the receipt is still pending on some nodes
    pub block_number: Option<String>,
    /// `"0x1"` success, `"0x0"` reverted; absent before Byzantium
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "0x1")
    }
}
