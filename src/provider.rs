//! Wallet provider capability
//!
//! The controller never talks to a concrete wallet. It is handed an
//! implementation of [`ProviderGateway`], which covers account enumeration,
//! network and balance queries, signing/broadcast and confirmation, plus
//! push events for account and chain changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::address::Address;
use crate::amount::Wei;
use crate::error::GatewayError;

/// How accounts are requested from the provider
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountsMode {
    /// Already-authorized accounts, no prompt (`eth_accounts`)
    Silent,
    /// Triggers the provider's permission UI (`eth_requestAccounts`)
    Interactive,
}

/// Which wallet sits behind the provider, for display
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    MetaMask,
    CoinbaseWallet,
    BraveWallet,
    #[default]
    Generic,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MetaMask => "MetaMask",
            Self::CoinbaseWallet => "Coinbase Wallet",
            Self::BraveWallet => "Brave Wallet",
            Self::Generic => "Ethereum Provider",
        }
    }

    /// Lenient parse used by configuration; unknown names map to `Generic`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "metamask" => Self::MetaMask,
            "coinbase" | "coinbasewallet" => Self::CoinbaseWallet,
            "brave" | "bravewallet" => Self::BraveWallet,
            _ => Self::Generic,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Network identity as reported by the provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
}

/// A native-currency transfer handed to the provider for signing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub value: Wei,
}

/// Transaction hash as returned by the provider
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusion receipt for a mined transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub hash: TxHash,
    pub block_number: u64,
    /// `false` when the transaction was mined but reverted
    pub success: bool,
}

/// Async capability interface over an injected wallet
///
/// Every call is a potential indefinite suspension; implementations must not
/// impose their own timeouts on `send_transaction` or
/// `wait_for_confirmation`.
#[async_trait]
pub trait ProviderGateway: Send + Sync + 'static {
    /// Whether a wallet capability is present at all
    fn has_provider(&self) -> bool;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Generic
    }

    async fn request_accounts(&self, mode: AccountsMode) -> Result<Vec<Address>, GatewayError>;

    async fn get_network(&self) -> Result<NetworkInfo, GatewayError>;

    async fn get_balance(&self, address: &Address) -> Result<Wei, GatewayError>;

    /// Returns once the provider signed and accepted the transaction
    async fn send_transaction(&self, request: TxRequest) -> Result<TxHash, GatewayError>;

    /// Suspends until the transaction is mined
    async fn wait_for_confirmation(&self, hash: &TxHash) -> Result<Receipt, GatewayError>;

    fn subscribe_accounts_changed(&self) -> Subscription<Vec<Address>>;

    /// Delivers the new chain id
    fn subscribe_chain_changed(&self) -> Subscription<u64>;
}

/// Registration for provider-pushed events
///
/// Unregisters when dropped, so holding it in a scope bounds the
/// subscription's lifetime.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: Option<broadcast::Receiver<T>>,
}

impl<T: Clone> Subscription<T> {
    pub fn new(receiver: broadcast::Receiver<T>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// A subscription that never yields, for providers without events
    pub fn closed() -> Self {
        Self { receiver: None }
    }

    /// Next event, or `None` once the provider side has gone away
    ///
    /// Lagging subscribers skip to the newest retained event; every event
    /// here is a full snapshot, so older ones carry nothing extra.
    pub async fn recv(&mut self) -> Option<T> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Provider subscription lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Explicit teardown; equivalent to dropping the handle
    pub fn unsubscribe(mut self) {
        self.receiver.take();
    }
}

const EVENT_CAPACITY: usize = 16;

/// Fan-out for provider events, embedded by provider implementations
#[derive(Clone, Debug)]
pub struct EventHub {
    accounts: broadcast::Sender<Vec<Address>>,
    chain: broadcast::Sender<u64>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (accounts, _) = broadcast::channel(EVENT_CAPACITY);
        let (chain, _) = broadcast::channel(EVENT_CAPACITY);
        Self { accounts, chain }
    }

    pub fn subscribe_accounts(&self) -> Subscription<Vec<Address>> {
        Subscription::new(self.accounts.subscribe())
    }

    pub fn subscribe_chain(&self) -> Subscription<u64> {
        Subscription::new(self.chain.subscribe())
    }

    /// Returns the number of live subscribers that received the event
    pub fn emit_accounts_changed(&self, accounts: Vec<Address>) -> usize {
        self.accounts.send(accounts).unwrap_or(0)
    }

    pub fn emit_chain_changed(&self, chain_id: u64) -> usize {
        self.chain.send(chain_id).unwrap_or(0)
    }

    pub fn accounts_subscribers(&self) -> usize {
        self.accounts.receiver_count()
    }

    pub fn chain_subscribers(&self) -> usize {
        self.chain.receiver_count()
    }
}

/// Human name for well-known chain ids, `"unknown"` otherwise
pub fn network_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "mainnet",
        10 => "optimism",
        56 => "bnb",
        137 => "matic",
        8453 => "base",
        17000 => "holesky",
        42161 => "arbitrum",
        11155111 => "sepolia",
        _ => "unknown",
    }
}
