//! Wallet state published by the controller
//!
//! `WalletState` is a plain value: the controller owns the only writer and
//! hands out clones or watch receivers, so no other component can mutate it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Wei;
use crate::error::ErrorKind;
use crate::provider::{NetworkInfo, TxHash};

/// Whether the wallet is linked to an account, and which one
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected {
        address: Address,
        provider_label: String,
    },
}

/// Network identity attached to a connected wallet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub network_name: String,
    pub chain_id: u64,
    pub fetched_at: DateTime<Utc>,
}

impl From<NetworkInfo> for ChainSnapshot {
    fn from(info: NetworkInfo) -> Self {
        Self {
            network_name: info.name,
            chain_id: info.chain_id,
            fetched_at: Utc::now(),
        }
    }
}

/// Last known balance; may lag the chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub wei: Wei,
    pub fetched_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn new(wei: Wei) -> Self {
        Self {
            wei,
            fetched_at: Utc::now(),
        }
    }
}

/// User-edited transfer inputs, kept as typed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub recipient: String,
    pub amount: String,
}

impl TransactionDraft {
    pub fn is_empty(&self) -> bool {
        self.recipient.is_empty() && self.amount.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Submitting,
    AwaitingSignature,
    Pending,
    Confirmed,
    Failed,
}

impl AttemptStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting | Self::AwaitingSignature | Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_in_flight()
    }
}

/// One submission, from validation to a terminal status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAttempt {
    pub id: u64,
    pub status: AttemptStatus,
    pub to: Address,
    pub value: Wei,
    pub hash: Option<TxHash>,
    pub error: Option<ErrorKind>,
    pub started_at: DateTime<Utc>,
}

impl TransactionAttempt {
    pub fn new(id: u64, to: Address, value: Wei) -> Self {
        Self {
            id,
            status: AttemptStatus::Submitting,
            to,
            value,
            hash: None,
            error: None,
            started_at: Utc::now(),
        }
    }
}

/// Coarse position in the connection/transaction state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Connecting,
    Connected,
    Submitting,
    AwaitingSignature,
    Pending,
    Confirmed,
}

impl Phase {
    /// `Idle` and `Connected` are the only phases a failure can leave behind
    pub fn is_resting(&self) -> bool {
        matches!(self, Self::Idle | Self::Connected)
    }
}

/// The action a surfaced failure came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
    /// Silent reconnect at startup
    Init,
    Connect,
    Transfer,
}

/// Everything the controller publishes: connection, snapshots, draft and attempt
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    pub connection: ConnectionState,
    pub chain: Option<ChainSnapshot>,
    pub balance: Option<BalanceSnapshot>,
    pub draft: TransactionDraft,
    pub attempt: Option<TransactionAttempt>,
    /// Failure surfaced to the user until dismissed or superseded
    pub error: Option<ErrorKind>,
    pub error_origin: Option<ErrorOrigin>,
    /// Broadcast transaction whose tracking was dropped by an account or chain change
    pub orphaned_hash: Option<TxHash>,
}

impl WalletState {
    pub fn phase(&self) -> Phase {
        match &self.connection {
            ConnectionState::Disconnected => Phase::Idle,
            ConnectionState::Connecting => Phase::Connecting,
            ConnectionState::Connected { .. } => match self.attempt.as_ref().map(|a| a.status) {
                Some(AttemptStatus::Submitting) => Phase::Submitting,
                Some(AttemptStatus::AwaitingSignature) => Phase::AwaitingSignature,
                Some(AttemptStatus::Pending) => Phase::Pending,
                Some(AttemptStatus::Confirmed) => Phase::Confirmed,
                Some(AttemptStatus::Failed) | None => Phase::Connected,
            },
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, ConnectionState::Connected { .. })
    }

    pub fn connected_address(&self) -> Option<&Address> {
        match &self.connection {
            ConnectionState::Connected { address, .. } => Some(address),
            _ => None,
        }
    }

    pub fn has_attempt_in_flight(&self) -> bool {
        self.attempt
            .as_ref()
            .is_some_and(|a| a.status.is_in_flight())
    }

    pub fn balance_wei(&self) -> Option<Wei> {
        self.balance.as_ref().map(|b| b.wei)
    }

    /// Surface `kind`, replacing any earlier failure
    pub fn surface(&mut self, kind: ErrorKind, origin: ErrorOrigin) {
        self.error = Some(kind);
        self.error_origin = Some(origin);
    }

    /// Returns `true` if there was an error to clear
    pub fn clear_error(&mut self) -> bool {
        self.error_origin = None;
        self.error.take().is_some()
    }
}
