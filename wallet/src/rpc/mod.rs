/// Ethereum JSON-RPC provider
///
/// `JsonRpcClient` speaks JSON-RPC 2.0 over HTTP; `JsonRpcProvider` implements
/// the wallet gateway on top of it for nodes that manage their own accounts.
pub mod client;
pub mod provider;
pub mod types;

pub use client::JsonRpcClient;
pub use provider::{EventPoller, JsonRpcProvider};
