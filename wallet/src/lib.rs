//! web3-wallet: HTTP front end for the web3-transfer state machine
//!
//! Wires a [`rpc::JsonRpcProvider`] into a `TransactionController`, keeps the
//! login session on disk and serves the wallet view over axum.

pub mod api;
pub mod config;
pub mod error;
pub mod rpc;
pub mod session;

pub use config::AppConfig;
pub use error::{AppError, RpcError, StorageError};
pub use rpc::{JsonRpcClient, JsonRpcProvider};
pub use session::{FileSessionStore, Session};
