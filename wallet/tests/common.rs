/// Common test utilities for web3-wallet integration tests
///
/// This module provides shared test infrastructure including:
/// - An in-process mock Ethereum JSON-RPC node (axum on a random port)
/// - Scriptable node behaviour (rejections, unsupported methods, reverts)
/// - An API test environment with a temporary session file
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

use web3_transfer::{Presenter, ProviderKind, TransactionController, ViewConfig};
use web3_wallet::api::{create_router, AppState};
use web3_wallet::{FileSessionStore, JsonRpcProvider};

pub const ACCOUNT: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";
pub const RECIPIENT: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f42e4e";
pub const OTHER_ACCOUNT: &str = "0x1000000000000000000000000000000000000001";
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;
pub const SEPOLIA: u64 = 11155111;

/// Short polling keeps receipt waits fast in tests
pub const POLL: Duration = Duration::from_millis(20);

pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

#[derive(Clone, Debug)]
pub enum RequestAccounts {
    Grant,
    Reject,
    Unsupported,
}

#[derive(Clone, Debug)]
pub enum SendBehaviour {
    Accept,
    Reject,
    Fail(String),
}

pub struct NodeState {
    pub accounts: Vec<String>,
    pub chain_id: u64,
    /// Keyed by lowercase address
    pub balances: HashMap<String, u128>,
    pub request_accounts: RequestAccounts,
    pub send: SendBehaviour,
    /// `null` receipts returned before a transaction is reported mined
    pub pending_polls: usize,
    pub revert: bool,
    pub block_number: u64,
    pub sent: Vec<Value>,
    pub calls: Vec<String>,
    receipts: HashMap<String, usize>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            accounts: vec![ACCOUNT.to_string()],
            chain_id: SEPOLIA,
            balances: HashMap::new(),
            request_accounts: RequestAccounts::Grant,
            send: SendBehaviour::Accept,
            pending_polls: 0,
            revert: false,
            block_number: 42,
            sent: Vec::new(),
            calls: Vec::new(),
            receipts: HashMap::new(),
        }
    }
}

type Node = Arc<Mutex<NodeState>>;

/// Mock JSON-RPC node serving on 127.0.0.1
pub struct MockNode {
    pub addr: SocketAddr,
    pub state: Node,
    task: JoinHandle<()>,
}

impl MockNode {
    pub async fn start() -> anyhow::Result<Self> {
        init_logging();
        let state: Node = Arc::new(Mutex::new(NodeState::default()));
        let app = Router::new()
            .route("/", post(rpc_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("mock node stopped: {}", e);
            }
        });
        log::info!("🧪 Mock node listening on http://{}", addr);

        Ok(Self { addr, state, task })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_balance(&self, account: &str, wei: u128) {
        self.with(|node| node.balances.insert(account.to_lowercase(), wei));
    }

    pub fn balance(&self, account: &str) -> u128 {
        self.with(|node| {
            node.balances
                .get(&account.to_lowercase())
                .copied()
                .unwrap_or(0)
        })
    }

    pub fn calls(&self, method: &str) -> usize {
        self.with(|node| node.calls.iter().filter(|m| *m == method).count())
    }

    pub fn provider(&self) -> JsonRpcProvider {
        JsonRpcProvider::new(self.url(), ProviderKind::MetaMask, POLL)
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn rpc_error(id: &Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

fn rpc_result(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

async fn rpc_handler(State(node): State<Node>, Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let method = req["method"].as_str().unwrap_or_default().to_string();
    let params = req["params"].clone();

    let mut node = node.lock().unwrap();
    node.calls.push(method.clone());

    let response = match method.as_str() {
        "eth_accounts" => rpc_result(&id, json!(node.accounts)),
        "eth_requestAccounts" => match node.request_accounts {
            RequestAccounts::Grant => rpc_result(&id, json!(node.accounts)),
            RequestAccounts::Reject => rpc_error(&id, 4001, "User rejected the request."),
            RequestAccounts::Unsupported => {
                rpc_error(&id, -32601, "the method eth_requestAccounts does not exist")
            }
        },
        "eth_chainId" => rpc_result(&id, json!(format!("0x{:x}", node.chain_id))),
        "eth_getBalance" => {
            let account = params[0].as_str().unwrap_or_default().to_lowercase();
            let wei = node.balances.get(&account).copied().unwrap_or(0);
            rpc_result(&id, json!(format!("0x{:x}", wei)))
        }
        "eth_sendTransaction" => match node.send.clone() {
            SendBehaviour::Accept => {
                let tx = params[0].clone();
                node.sent.push(tx);
                let hash = format!("0x{:064x}", node.sent.len());
                let polls = node.pending_polls;
                node.receipts.insert(hash.clone(), polls);
                rpc_result(&id, json!(hash))
            }
            SendBehaviour::Reject => {
                rpc_error(&id, 4001, "MetaMask Tx Signature: User denied transaction signature.")
            }
            SendBehaviour::Fail(message) => rpc_error(&id, -32000, &message),
        },
        "eth_getTransactionReceipt" => {
            let hash = params[0].as_str().unwrap_or_default().to_string();
            match node.receipts.get(&hash).copied() {
                None => rpc_result(&id, Value::Null),
                Some(remaining) if remaining > 0 => {
                    node.receipts.insert(hash, remaining - 1);
                    rpc_result(&id, Value::Null)
                }
                Some(_) => {
                    mine(&mut node, &hash);
                    let status = if node.revert { "0x0" } else { "0x1" };
                    rpc_result(
                        &id,
                        json!({
                            "transactionHash": hash,
                            "blockNumber": format!("0x{:x}", node.block_number),
                            "status": status,
                        }),
                    )
                }
            }
        }
        other => rpc_error(&id, -32601, &format!("the method {} does not exist", other)),
    };

    Json(response)
}

/// Apply the value transfer of `hash` once
fn mine(node: &mut NodeState, hash: &str) {
    let Some(index) = hash
        .strip_prefix("0x")
        .and_then(|h| usize::from_str_radix(h, 16).ok())
    else {
        return;
    };
    if node.revert || node.receipts.get(hash) != Some(&0) {
        return;
    }
    node.receipts.insert(hash.to_string(), usize::MAX);
    let Some(tx) = node.sent.get(index - 1).cloned() else {
        return;
    };
    let from = tx["from"].as_str().unwrap_or_default().to_lowercase();
    let to = tx["to"].as_str().unwrap_or_default().to_lowercase();
    let value = tx["value"]
        .as_str()
        .and_then(|v| v.strip_prefix("0x"))
        .and_then(|v| u128::from_str_radix(v, 16).ok())
        .unwrap_or(0);

    let sender = node.balances.entry(from).or_default();
    *sender = sender.saturating_sub(value);
    *node.balances.entry(to).or_default() += value;
}

/// HTTP API served against a mock node, with a temporary session file
pub struct ApiEnvironment {
    pub node: MockNode,
    pub temp_dir: TempDir,
    pub base_url: String,
    pub http: reqwest::Client,
    server: JoinHandle<()>,
}

impl ApiEnvironment {
    pub async fn start() -> anyhow::Result<Self> {
        let node = MockNode::start().await?;
        let temp_dir = TempDir::new()?;
        log::info!("📁 Test directory: {:?}", temp_dir.path());

        let provider = Arc::new(node.provider());
        let controller = Arc::new(TransactionController::new(provider));
        let presenter = Presenter::new(controller, ViewConfig::default());
        let sessions = FileSessionStore::new(temp_dir.path().join("session.json"));
        let state = Arc::new(AppState::new(presenter, sessions, None));

        let app = create_router(state, CorsLayer::permissive());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("api server stopped: {}", e);
            }
        });

        Ok(Self {
            node,
            temp_dir,
            base_url: format!("http://{}", addr),
            http: reqwest::Client::new(),
            server,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json(&self, path: &str) -> anyhow::Result<Value> {
        Ok(self.http.get(self.url(path)).send().await?.json().await?)
    }

    pub async fn post_json(&self, path: &str) -> anyhow::Result<Value> {
        Ok(self.http.post(self.url(path)).send().await?.json().await?)
    }

    /// Poll `GET /api/wallet` until the view satisfies `predicate`
    pub async fn wait_until(&self, predicate: impl Fn(&Value) -> bool) -> anyhow::Result<Value> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let view = self.get_json("/api/wallet").await?;
            if predicate(&view) {
                return Ok(view);
            }
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("timed out waiting for view, last: {}", view);
            }
            tokio::time::sleep(POLL).await;
        }
    }

    pub async fn wait_for_phase(&self, phase: &str) -> anyhow::Result<Value> {
        self.wait_until(|view| view["phase"] == phase).await
    }
}

impl Drop for ApiEnvironment {
    fn drop(&mut self) {
        self.server.abort();
    }
}
