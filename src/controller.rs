//! Connection and transaction state machine
//!
//! `TransactionController` is the single writer of [`WalletState`]. Commands
//! (connect, submit, ...) and provider events are applied in short synchronous
//! sections between suspension points, so transitions never interleave
//! half-way. After every provider call the controller re-checks that the
//! context it started from (connection, attempt id) is still current before
//! applying the result. Snapshot fetches also carry an epoch that account,
//! chain and connection changes bump, so a slow response for an old context
//! is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::address::Address;
use crate::error::ErrorKind;
use crate::provider::{AccountsMode, ProviderGateway, TxRequest};
use crate::state::{
    AttemptStatus, BalanceSnapshot, ChainSnapshot, ConnectionState, ErrorOrigin, Phase,
    TransactionAttempt, TransactionDraft, WalletState,
};
use crate::validator::validate_transfer;

struct InFlight {
    id: u64,
    cancel: CancellationToken,
}

/// Drives a wallet provider through connect, refresh and transfer flows
pub struct TransactionController<P: ProviderGateway> {
    provider: Arc<P>,
    state: watch::Sender<WalletState>,
    inflight: Mutex<Option<InFlight>>,
    next_attempt_id: AtomicU64,
    /// Bumped only inside state writes, so a reader holding the state sees a
    /// consistent value
    snapshot_epoch: AtomicU64,
}

impl<P: ProviderGateway> TransactionController<P> {
    pub fn new(provider: Arc<P>) -> Self {
        let (state, _) = watch::channel(WalletState::default());
        Self {
            provider,
            state,
            inflight: Mutex::new(None),
            next_attempt_id: AtomicU64::new(1),
            snapshot_epoch: AtomicU64::new(0),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Snapshot of the current state
    pub fn state(&self) -> WalletState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    /// Receiver that observes every published transition
    pub fn subscribe(&self) -> watch::Receiver<WalletState> {
        self.state.subscribe()
    }

    fn connected_address(&self) -> Option<Address> {
        self.state.borrow().connected_address().cloned()
    }

    /// Connected address and current snapshot epoch, read together
    fn snapshot_context(&self) -> Option<(Address, u64)> {
        let state = self.state.borrow();
        let address = state.connected_address()?.clone();
        Some((address, self.snapshot_epoch.load(Ordering::SeqCst)))
    }

    fn bump_epoch(&self) {
        self.snapshot_epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn invalidate_snapshots(&self, s: &mut WalletState) {
        self.bump_epoch();
        s.chain = None;
        s.balance = None;
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.snapshot_epoch.load(Ordering::SeqCst) == epoch
    }

    fn lock_inflight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    /// Reconnect silently to an already-authorized account, if any
    pub async fn init(&self) {
        if !self.provider.has_provider() {
            log::info!("No wallet provider detected at startup");
            return;
        }
        if self.state.borrow().is_connected() {
            return;
        }

        let accounts = match self.provider.request_accounts(AccountsMode::Silent).await {
            Ok(accounts) => accounts,
            Err(e) => {
                log::warn!("Failed to check wallet connection: {}", e);
                self.state.send_modify(|s| {
                    s.surface(ErrorKind::from(e), ErrorOrigin::Init)
                });
                return;
            }
        };

        let Some(address) = accounts.into_iter().next() else {
            log::debug!("No previously authorized accounts");
            return;
        };

        let label = self.provider.kind().label().to_string();
        let applied = self.state.send_if_modified(|s| {
            if !matches!(s.connection, ConnectionState::Disconnected) {
                return false;
            }
            s.connection = ConnectionState::Connected {
                address: address.clone(),
                provider_label: label,
            };
            true
        });

        if applied {
            log::info!("🔌 Restored wallet connection: {}", address);
            self.refresh_snapshots().await;
        }
    }

    /// Interactive connect; a no-op unless currently disconnected
    pub async fn connect(&self) {
        let has_provider = self.provider.has_provider();
        let started = self.state.send_if_modified(|s| {
            if !matches!(s.connection, ConnectionState::Disconnected) {
                return false;
            }
            if has_provider {
                s.connection = ConnectionState::Connecting;
                s.clear_error();
            } else {
                s.surface(ErrorKind::NoProvider, ErrorOrigin::Connect);
            }
            true
        });

        if !started {
            log::debug!("connect ignored: wallet is not idle");
            return;
        }
        if !has_provider {
            log::warn!("Connect requested but no wallet provider is available");
            return;
        }

        let label = self.provider.kind().label().to_string();
        log::info!("Requesting accounts from {}", label);

        let outcome = match self.provider.request_accounts(AccountsMode::Interactive).await {
            Ok(accounts) => accounts
                .into_iter()
                .next()
                .ok_or_else(|| ErrorKind::provider("no accounts returned")),
            Err(e) => Err(ErrorKind::from(e)),
        };

        let applied = self.state.send_if_modified(|s| {
            if !matches!(s.connection, ConnectionState::Connecting) {
                return false;
            }
            match &outcome {
                Ok(address) => {
                    s.connection = ConnectionState::Connected {
                        address: address.clone(),
                        provider_label: label.clone(),
                    };
                }
                Err(kind) => {
                    s.connection = ConnectionState::Disconnected;
                    s.surface(kind.clone(), ErrorOrigin::Connect);
                }
            }
            true
        });

        if !applied {
            log::debug!("Connect result dropped: connection state changed meanwhile");
            return;
        }

        match outcome {
            Ok(address) => {
                log::info!("✅ Wallet connected: {} ({})", address, label);
                self.refresh_snapshots().await;
            }
            Err(kind) => log::warn!("Wallet connection failed: {}", kind),
        }
    }

    /// Local-only disconnect; the provider keeps its permission grant
    pub fn disconnect(&self) {
        if let Some(inflight) = self.lock_inflight().take() {
            inflight.cancel.cancel();
        }
        self.state.send_modify(|s| {
            self.bump_epoch();
            *s = WalletState::default();
        });
        log::info!("🔓 Wallet disconnected");
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Network and balance, fetched concurrently
    pub async fn refresh_snapshots(&self) {
        tokio::join!(self.refresh_network(), self.refresh_balance());
    }

    pub async fn refresh_balance(&self) {
        let Some((address, epoch)) = self.snapshot_context() else {
            return;
        };

        match self.provider.get_balance(&address).await {
            Ok(wei) => {
                let applied = self.state.send_if_modified(|s| {
                    if !self.is_current(epoch) || s.connected_address() != Some(&address) {
                        return false;
                    }
                    s.balance = Some(BalanceSnapshot::new(wei));
                    true
                });
                if applied {
                    log::debug!("Balance for {}: {} ETH", address, wei.format_ether());
                } else {
                    log::debug!("Stale balance for {} dropped", address);
                }
            }
            Err(e) => log::warn!("Error fetching balance for {}: {}", address, e),
        }
    }

    pub async fn refresh_network(&self) {
        let Some((_, epoch)) = self.snapshot_context() else {
            return;
        };

        match self.provider.get_network().await {
            Ok(info) => {
                let chain_id = info.chain_id;
                let applied = self.state.send_if_modified(|s| {
                    if !self.is_current(epoch) || !s.is_connected() {
                        return false;
                    }
                    s.chain = Some(ChainSnapshot::from(info));
                    true
                });
                if applied {
                    log::debug!("Network: chain id {}", chain_id);
                } else {
                    log::debug!("Stale network info (chain id {}) dropped", chain_id);
                }
            }
            Err(e) => log::warn!("Error getting chain info: {}", e),
        }
    }

    // ------------------------------------------------------------------
    // Provider events
    // ------------------------------------------------------------------

    pub async fn handle_accounts_changed(&self, accounts: Vec<Address>) {
        let Some(current) = self.connected_address() else {
            log::debug!("accountsChanged ignored: wallet not connected");
            return;
        };

        let Some(head) = accounts.into_iter().next() else {
            log::info!("Wallet reported no accounts, disconnecting");
            self.disconnect();
            return;
        };

        if head == current {
            self.refresh_balance().await;
            return;
        }

        log::info!("Account changed: {} -> {}", current, head);
        self.abandon_inflight("account changed");
        self.state.send_if_modified(|s| match &mut s.connection {
            ConnectionState::Connected { address, .. } => {
                *address = head.clone();
                self.bump_epoch();
                s.balance = None;
                true
            }
            _ => false,
        });
        self.refresh_balance().await;
    }

    /// Chain context invalidates both snapshots; the connection is kept
    pub async fn handle_chain_changed(&self, chain_id: u64) {
        if !self.state.borrow().is_connected() {
            log::debug!("chainChanged ignored: wallet not connected");
            return;
        }

        log::info!("Chain changed to {}, refreshing snapshots", chain_id);
        self.abandon_inflight("chain changed");
        self.state.send_modify(|s| self.invalidate_snapshots(s));
        self.refresh_snapshots().await;
    }

    /// Stop tracking the in-flight attempt, keeping any broadcast hash visible
    fn abandon_inflight(&self, reason: &str) {
        if let Some(inflight) = self.lock_inflight().take() {
            inflight.cancel.cancel();
        }

        self.state.send_if_modified(|s| {
            if !s.has_attempt_in_flight() {
                return false;
            }
            if let Some(hash) = s.attempt.take().and_then(|a| a.hash) {
                log::warn!(
                    "⚠️  Stopped tracking transaction {} ({}); it may still confirm",
                    hash,
                    reason
                );
                s.orphaned_hash = Some(hash);
            } else {
                log::warn!("⚠️  In-flight transfer abandoned before broadcast ({})", reason);
            }
            true
        });
    }

    /// Spawn a task that feeds provider events into the controller
    ///
    /// Both subscriptions are taken before this returns, so no event emitted
    /// afterwards is missed. Dropping the handle releases them.
    pub fn spawn_event_listener(self: &Arc<Self>) -> EventListener {
        let mut accounts = self.provider.subscribe_accounts_changed();
        let mut chain = self.provider.subscribe_chain_changed();
        let controller = Arc::clone(self);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(list) = accounts.recv() => controller.handle_accounts_changed(list).await,
                    Some(chain_id) = chain.recv() => controller.handle_chain_changed(chain_id).await,
                    else => break,
                }
            }
            log::debug!("Provider event listener stopped");
        });

        EventListener { task: Some(task) }
    }

    // ------------------------------------------------------------------
    // Draft
    // ------------------------------------------------------------------

    pub fn set_recipient(&self, recipient: impl Into<String>) {
        let recipient = recipient.into();
        self.edit_draft(|draft| draft.recipient = recipient);
    }

    pub fn set_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        self.edit_draft(|draft| draft.amount = amount);
    }

    fn edit_draft(&self, edit: impl FnOnce(&mut TransactionDraft)) {
        self.state.send_if_modified(|s| {
            if !s.is_connected() || s.has_attempt_in_flight() {
                return false;
            }
            edit(&mut s.draft);
            true
        });
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Validate the draft and, if it passes, run one transfer to completion
    ///
    /// Resolves once the attempt reaches a terminal status, is cancelled, or
    /// is abandoned. A no-op unless connected with nothing in flight.
    pub async fn submit(&self) {
        let Some((id, token, request)) = self.begin_attempt() else {
            return;
        };

        self.update_attempt(id, |a| a.status = AttemptStatus::AwaitingSignature);
        log::info!(
            "Requesting signature: {} -> {} ({} ETH)",
            request.from,
            request.to,
            request.value.format_ether()
        );

        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::info!("Attempt {} stopped while awaiting signature", id);
                return;
            }
            result = self.provider.send_transaction(request) => result,
        };

        let hash = match sent {
            Ok(hash) => hash,
            Err(e) => {
                self.fail_attempt(id, ErrorKind::from(e));
                return;
            }
        };

        log::info!("📤 Transaction sent: {}", hash);
        let live = self.update_attempt(id, |a| {
            a.status = AttemptStatus::Pending;
            a.hash = Some(hash.clone());
        });
        if !live {
            return;
        }

        let confirmed = tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::info!("Attempt {} stopped while pending: {}", id, hash);
                return;
            }
            result = self.provider.wait_for_confirmation(&hash) => result,
        };

        match confirmed {
            Ok(receipt) if receipt.success => {
                let applied = self.finish_attempt(id, |s| {
                    if let Some(a) = s.attempt.as_mut() {
                        a.status = AttemptStatus::Confirmed;
                    }
                    s.draft = Default::default();
                });
                if applied {
                    log::info!(
                        "✅ Transaction confirmed: {} (block {})",
                        hash,
                        receipt.block_number
                    );
                    self.refresh_balance().await;
                }
            }
            Ok(receipt) => self.fail_attempt(
                id,
                ErrorKind::provider(format!(
                    "transaction {} reverted in block {}",
                    hash, receipt.block_number
                )),
            ),
            Err(e) => self.fail_attempt(id, ErrorKind::from(e)),
        }
    }

    /// Validate and register a new attempt, atomically with the in-flight check
    fn begin_attempt(&self) -> Option<(u64, CancellationToken, TxRequest)> {
        let mut inflight = self.lock_inflight();
        if inflight.is_some() {
            log::debug!("submit ignored: a transfer is already in flight");
            return None;
        }

        let mut begun = None;
        self.state.send_if_modified(|s| {
            let sender = match &s.connection {
                ConnectionState::Connected { address, .. } => address.clone(),
                _ => {
                    log::debug!("submit ignored: wallet not connected");
                    return false;
                }
            };
            if s.has_attempt_in_flight() {
                return false;
            }

            match validate_transfer(&s.draft.recipient, &s.draft.amount, &sender, s.balance_wei()) {
                Err(kind) => {
                    log::info!("Transfer rejected: {}", kind);
                    s.surface(kind, ErrorOrigin::Transfer);
                }
                Ok(transfer) => {
                    let id = self.next_attempt_id.fetch_add(1, Ordering::Relaxed);
                    s.clear_error();
                    s.attempt = Some(TransactionAttempt::new(id, transfer.to.clone(), transfer.value));
                    begun = Some((
                        id,
                        TxRequest {
                            from: sender,
                            to: transfer.to,
                            value: transfer.value,
                        },
                    ));
                }
            }
            true
        });

        let (id, request) = begun?;
        let cancel = CancellationToken::new();
        *inflight = Some(InFlight {
            id,
            cancel: cancel.clone(),
        });
        Some((id, cancel, request))
    }

    fn is_live(&self, id: u64) -> bool {
        self.lock_inflight()
            .as_ref()
            .is_some_and(|f| f.id == id && !f.cancel.is_cancelled())
    }

    /// Apply `update` to attempt `id` if it is still the live, in-flight one
    fn update_attempt(&self, id: u64, update: impl FnOnce(&mut TransactionAttempt)) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.state.send_if_modified(|s| match s.attempt.as_mut() {
            Some(a) if a.id == id && a.status.is_in_flight() => {
                update(a);
                true
            }
            _ => false,
        })
    }

    /// Move attempt `id` to a terminal status and release the in-flight slot
    fn finish_attempt(&self, id: u64, finish: impl FnOnce(&mut WalletState)) -> bool {
        let mut inflight = self.lock_inflight();
        if !inflight.as_ref().is_some_and(|f| f.id == id) {
            return false;
        }
        inflight.take();

        self.state.send_if_modified(|s| match s.attempt.as_ref() {
            Some(a) if a.id == id && a.status.is_in_flight() => {
                finish(s);
                true
            }
            _ => false,
        })
    }

    fn fail_attempt(&self, id: u64, kind: ErrorKind) {
        match &kind {
            ErrorKind::UserRejected => log::info!("Transaction rejected by user"),
            other => log::error!("❌ Transaction failed: {}", other),
        }
        self.finish_attempt(id, |s| {
            if let Some(a) = s.attempt.as_mut() {
                a.status = AttemptStatus::Failed;
                a.error = Some(kind.clone());
            }
            s.surface(kind, ErrorOrigin::Transfer);
        });
    }

    /// Stop waiting on the in-flight attempt
    ///
    /// The attempt ends as `Failed(Cancelled)`. A transaction that was already
    /// broadcast keeps its hash, since the ledger may still include it.
    /// Returns `false` when nothing was in flight.
    pub fn cancel(&self) -> bool {
        let Some(inflight) = self.lock_inflight().take() else {
            return false;
        };
        inflight.cancel.cancel();

        self.state.send_if_modified(|s| match s.attempt.as_mut() {
            Some(a) if a.id == inflight.id && a.status.is_in_flight() => {
                a.status = AttemptStatus::Failed;
                a.error = Some(ErrorKind::Cancelled);
                s.surface(ErrorKind::Cancelled, ErrorOrigin::Transfer);
                true
            }
            _ => false,
        });
        log::info!("Attempt {} cancelled", inflight.id);
        true
    }

    /// Clear the surfaced error and any terminal attempt
    pub fn dismiss(&self) {
        self.state.send_if_modified(|s| {
            let mut changed = s.clear_error();
            if s.attempt.as_ref().is_some_and(|a| a.status.is_terminal()) {
                s.attempt = None;
                changed = true;
            }
            if s.orphaned_hash.take().is_some() {
                changed = true;
            }
            changed
        });
    }
}

/// Handle for the provider event task; stops it when dropped
#[derive(Debug)]
pub struct EventListener {
    task: Option<JoinHandle<()>>,
}

impl EventListener {
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Stop the task and wait until its subscriptions are released
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
