//! Presentation mapping
//!
//! `WalletView` is what a front end renders: strings ready for display,
//! derived from a `WalletState` snapshot. `Presenter` goes the other way,
//! turning user actions into controller commands.

use serde::Serialize;
use std::sync::Arc;

use crate::amount::Wei;
use crate::controller::TransactionController;
use crate::error::ErrorKind;
use crate::provider::{ProviderGateway, TxHash};
use crate::state::{AttemptStatus, ConnectionState, ErrorOrigin, Phase, WalletState};

const SHORT_HASH_LEN: usize = 20;

/// Display settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewConfig {
    /// Explorer base URL; derived from the chain id when unset
    pub explorer_base: Option<String>,
    pub currency_symbol: String,
    pub balance_decimals: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            explorer_base: None,
            currency_symbol: "ETH".to_string(),
            balance_decimals: 6,
        }
    }
}

impl ViewConfig {
    pub fn explorer_base_for(&self, chain_id: Option<u64>) -> String {
        match &self.explorer_base {
            Some(base) => base.clone(),
            None => default_explorer_base(chain_id).to_string(),
        }
    }

    fn format_balance(&self, wei: Wei) -> String {
        wei.format_ether_fixed(self.balance_decimals)
    }
}

/// Etherscan host for well-known chains, mainnet otherwise
pub fn default_explorer_base(chain_id: Option<u64>) -> &'static str {
    match chain_id {
        Some(11155111) => "https://sepolia.etherscan.io",
        Some(17000) => "https://holesky.etherscan.io",
        _ => "https://etherscan.io",
    }
}

/// `<base>/tx/<hash>`
pub fn explorer_tx_url(base: &str, hash: &TxHash) -> String {
    format!("{}/tx/{}", base.trim_end_matches('/'), hash)
}

/// First characters of a hash followed by an ellipsis
pub fn short_hash(hash: &TxHash) -> String {
    let s = hash.as_str();
    match s.char_indices().nth(SHORT_HASH_LEN) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

/// User-facing message for a failure kind raised by `origin`
///
/// `balance_display` is only used by `InsufficientBalance`.
pub fn error_message(kind: &ErrorKind, origin: ErrorOrigin, balance_display: &str) -> String {
    if matches!(kind, ErrorKind::NoProvider) {
        return "Please install MetaMask or Coinbase Wallet extension".to_string();
    }
    match origin {
        ErrorOrigin::Init => format!("Error checking wallet connection: {}", detail(kind)),
        ErrorOrigin::Connect => format!("Error connecting wallet: {}", detail(kind)),
        ErrorOrigin::Transfer => transfer_error_message(kind, balance_display),
    }
}

/// Provider messages pass through verbatim; other kinds use their description
fn detail(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::ProviderError(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn transfer_error_message(kind: &ErrorKind, balance_display: &str) -> String {
    match kind {
        ErrorKind::NoProvider => "Please install MetaMask or Coinbase Wallet extension".to_string(),
        ErrorKind::UserRejected => "Transaction rejected by user".to_string(),
        ErrorKind::EmptyRecipient => "Please enter a recipient address".to_string(),
        ErrorKind::EmptyAmount => "Please enter an amount".to_string(),
        ErrorKind::MalformedAddress => "Invalid Ethereum address format".to_string(),
        ErrorKind::SelfSend => "Cannot send to the same address".to_string(),
        ErrorKind::InvalidAmount => "Amount must be a positive number".to_string(),
        ErrorKind::InsufficientBalance => {
            format!("Insufficient balance. Your balance: {}", balance_display)
        }
        ErrorKind::ProviderError(msg) => format!("Transaction failed: {}", msg),
        ErrorKind::Cancelled => "Transaction tracking cancelled".to_string(),
    }
}

pub fn status_line(status: AttemptStatus) -> Option<&'static str> {
    match status {
        AttemptStatus::Submitting => Some("Validating..."),
        AttemptStatus::AwaitingSignature => Some("Waiting for user confirmation..."),
        AttemptStatus::Pending => Some("Transaction sent! Waiting for confirmation..."),
        AttemptStatus::Confirmed => Some("Transaction confirmed!"),
        AttemptStatus::Failed => None,
    }
}

/// Render-ready projection of `WalletState`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WalletView {
    pub phase: Phase,
    pub connected: bool,
    pub address: Option<String>,
    pub provider_label: Option<String>,
    pub balance: Option<String>,
    pub network: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub tx_hash: Option<String>,
    pub tx_hash_short: Option<String>,
    pub explorer_url: Option<String>,
    pub orphaned_hash: Option<String>,
    pub orphaned_explorer_url: Option<String>,
    pub recipient: String,
    pub amount: String,
    pub inputs_disabled: bool,
    pub can_cancel: bool,
    pub submit_label: String,
}

impl WalletView {
    pub fn from_state(state: &WalletState, config: &ViewConfig) -> Self {
        let symbol = &config.currency_symbol;
        let balance = state
            .balance_wei()
            .map(|wei| format!("{} {}", config.format_balance(wei), symbol));
        let balance_for_errors = balance
            .clone()
            .unwrap_or_else(|| format!("{} {}", config.format_balance(Wei::ZERO), symbol));

        let chain_id = state.chain.as_ref().map(|c| c.chain_id);
        let explorer_base = config.explorer_base_for(chain_id);

        let (address, provider_label) = match &state.connection {
            ConnectionState::Connected {
                address,
                provider_label,
            } => (Some(address.to_string()), Some(provider_label.clone())),
            _ => (None, None),
        };

        let attempt = state.attempt.as_ref();
        let hash = attempt.and_then(|a| a.hash.as_ref());
        let in_flight = state.has_attempt_in_flight();

        Self {
            phase: state.phase(),
            connected: state.is_connected(),
            address,
            provider_label,
            balance,
            network: state
                .chain
                .as_ref()
                .map(|c| format!("{} (Chain ID: {})", c.network_name, c.chain_id)),
            status: attempt
                .and_then(|a| status_line(a.status))
                .map(str::to_string),
            error: state
                .error
                .as_ref()
                .map(|kind| {
                    let origin = state.error_origin.unwrap_or(ErrorOrigin::Transfer);
                    error_message(kind, origin, &balance_for_errors)
                }),
            error_kind: state.error.clone(),
            tx_hash: hash.map(|h| h.to_string()),
            tx_hash_short: hash.map(short_hash),
            explorer_url: hash.map(|h| explorer_tx_url(&explorer_base, h)),
            orphaned_hash: state.orphaned_hash.as_ref().map(|h| h.to_string()),
            orphaned_explorer_url: state
                .orphaned_hash
                .as_ref()
                .map(|h| explorer_tx_url(&explorer_base, h)),
            recipient: state.draft.recipient.clone(),
            amount: state.draft.amount.clone(),
            inputs_disabled: in_flight,
            can_cancel: in_flight,
            submit_label: if in_flight {
                "Processing...".to_string()
            } else {
                "Send Transaction".to_string()
            },
        }
    }
}

/// A user interaction coming from the front end
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    Connect,
    Disconnect,
    EditRecipient(String),
    EditAmount(String),
    Submit,
    Cancel,
    Dismiss,
    CopyAddress,
}

/// What an action produced beyond the state change itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    /// Text for the clipboard: the connected address, verbatim
    Copied(String),
    NothingToCopy,
}

/// Maps user actions onto controller commands and state onto views
pub struct Presenter<P: ProviderGateway> {
    controller: Arc<TransactionController<P>>,
    config: ViewConfig,
}

impl<P: ProviderGateway> Presenter<P> {
    pub fn new(controller: Arc<TransactionController<P>>, config: ViewConfig) -> Self {
        Self { controller, config }
    }

    pub fn controller(&self) -> &Arc<TransactionController<P>> {
        &self.controller
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn view(&self) -> WalletView {
        WalletView::from_state(&self.controller.state(), &self.config)
    }

    /// Run an action to completion
    ///
    /// `Submit` resolves only when the attempt settles; callers that must not
    /// block should spawn it.
    pub async fn dispatch(&self, action: UserAction) -> ActionOutcome {
        log::debug!("Dispatching {:?}", action);
        match action {
            UserAction::Connect => self.controller.connect().await,
            UserAction::Disconnect => self.controller.disconnect(),
            UserAction::EditRecipient(value) => self.controller.set_recipient(value),
            UserAction::EditAmount(value) => self.controller.set_amount(value),
            UserAction::Submit => self.controller.submit().await,
            UserAction::Cancel => {
                self.controller.cancel();
            }
            UserAction::Dismiss => self.controller.dismiss(),
            UserAction::CopyAddress => {
                return match self.controller.state().connected_address() {
                    Some(address) => ActionOutcome::Copied(address.as_str().to_string()),
                    None => ActionOutcome::NothingToCopy,
                };
            }
        }
        ActionOutcome::Done
    }
}
