use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use web3_transfer::{
    network_name, AccountsMode, Address, EventHub, GatewayError, NetworkInfo, ProviderGateway,
    ProviderKind, Receipt, Subscription, TxHash, TxRequest, Wei,
};

use super::client::{parse_quantity, JsonRpcClient};
use super::types::{TransactionObject, TransactionReceipt};
use crate::error::RpcError;

/// Wallet gateway backed by a node that holds the accounts
///
/// Signing happens on the node (a dev chain or a signer proxy). The node has
/// no push channel, so account and chain changes are detected by polling
/// (see [`JsonRpcProvider::spawn_event_poller`]).
pub struct JsonRpcProvider {
    client: JsonRpcClient,
    kind: ProviderKind,
    poll_interval: Duration,
    events: EventHub,
}

impl JsonRpcProvider {
    pub fn new(url: impl Into<String>, kind: ProviderKind, poll_interval: Duration) -> Self {
        Self {
            client: JsonRpcClient::new(url),
            kind,
            poll_interval,
            events: EventHub::new(),
        }
    }

    async fn accounts(&self, method: &str) -> Result<Vec<Address>, RpcError> {
        let raw: Vec<String> = self.client.call(method, json!([])).await?;
        raw.iter()
            .map(|s| {
                Address::parse(s)
                    .map_err(|e| RpcError::Decode(format!("account '{}': {}", s, e)))
            })
            .collect()
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        let raw: String = self.client.call("eth_chainId", json!([])).await?;
        parse_quantity(&raw)
    }

    /// Poll accounts and chain id, emitting change events
    ///
    /// The first successful poll sets the baseline and emits nothing. Polling
    /// errors are logged and retried on the next tick.
    pub fn spawn_event_poller(self: &Arc<Self>) -> EventPoller {
        let provider = Arc::clone(self);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(provider.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut seen = Seen::default();

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => provider.poll_once(&mut seen).await,
                }
            }
            log::debug!("Event poller stopped");
        });

        EventPoller {
            cancel,
            task: Some(task),
        }
    }

    async fn poll_once(&self, seen: &mut Seen) {
        match self.accounts("eth_accounts").await {
            Ok(accounts) => {
                if seen.accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                    log::info!("Node accounts changed ({} account(s))", accounts.len());
                    self.events.emit_accounts_changed(accounts.clone());
                }
                seen.accounts = Some(accounts);
            }
            Err(e) => log::debug!("eth_accounts poll failed: {}", e),
        }

        match self.chain_id().await {
            Ok(chain_id) => {
                if seen.chain_id.is_some_and(|prev| prev != chain_id) {
                    log::info!("Node chain changed to {}", chain_id);
                    self.events.emit_chain_changed(chain_id);
                }
                seen.chain_id = Some(chain_id);
            }
            Err(e) => log::debug!("eth_chainId poll failed: {}", e),
        }
    }
}

#[derive(Default)]
struct Seen {
    accounts: Option<Vec<Address>>,
    chain_id: Option<u64>,
}

#[async_trait]
impl ProviderGateway for JsonRpcProvider {
    fn has_provider(&self) -> bool {
        true
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn request_accounts(&self, mode: AccountsMode) -> Result<Vec<Address>, GatewayError> {
        let accounts = match mode {
            AccountsMode::Silent => self.accounts("eth_accounts").await?,
            AccountsMode::Interactive => match self.accounts("eth_requestAccounts").await {
                Err(e) if e.code() == Some(RpcError::METHOD_NOT_FOUND) => {
                    log::debug!("eth_requestAccounts unsupported, using eth_accounts");
                    self.accounts("eth_accounts").await?
                }
                other => other?,
            },
        };
        Ok(accounts)
    }

    async fn get_network(&self) -> Result<NetworkInfo, GatewayError> {
        let chain_id = self.chain_id().await?;
        Ok(NetworkInfo {
            name: network_name(chain_id).to_string(),
            chain_id,
        })
    }

    async fn get_balance(&self, address: &Address) -> Result<Wei, GatewayError> {
        let raw: String = self
            .client
            .call("eth_getBalance", json!([address.to_lowercase_hex(), "latest"]))
            .await?;
        Wei::from_hex_quantity(&raw).map_err(|e| GatewayError::provider(e.to_string()))
    }

    async fn send_transaction(&self, request: TxRequest) -> Result<TxHash, GatewayError> {
        let tx = TransactionObject {
            from: request.from.to_lowercase_hex(),
            to: request.to.to_lowercase_hex(),
            value: request.value.to_hex_quantity(),
        };
        let hash: String = self.client.call("eth_sendTransaction", json!([tx])).await?;
        Ok(TxHash::new(hash))
    }

    async fn wait_for_confirmation(&self, hash: &TxHash) -> Result<Receipt, GatewayError> {
        loop {
            let receipt: Option<TransactionReceipt> = self
                .client
                .call("eth_getTransactionReceipt", json!([hash.as_str()]))
                .await?;

            if let Some(receipt) = receipt {
                if let Some(block) = receipt.block_number.as_deref() {
                    return Ok(Receipt {
                        hash: hash.clone(),
                        block_number: parse_quantity(block)?,
                        success: receipt.succeeded(),
                    });
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn subscribe_accounts_changed(&self) -> Subscription<Vec<Address>> {
        self.events.subscribe_accounts()
    }

    fn subscribe_chain_changed(&self) -> Subscription<u64> {
        self.events.subscribe_chain()
    }
}

/// Handle for the polling task; stops it when dropped
pub struct EventPoller {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl EventPoller {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for EventPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
