/// Shared test infrastructure for controller and presenter tests
///
/// `FakeProvider` is a scriptable in-memory wallet:
/// - accounts, network and balances are plain fields
/// - connect/sign/confirm responses are scripted per test
/// - signature and confirmation can be held open to observe in-flight states
/// - the next network or balance query can be held open to deliver a late answer
/// - every call is counted so tests can assert the provider was never reached
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};

use web3_transfer::{
    AccountsMode, Address, EventHub, GatewayError, NetworkInfo, Phase, ProviderGateway,
    ProviderKind, Receipt, Subscription, TransactionController, TxHash, TxRequest, WalletState,
    Wei,
};

pub const SENDER: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";
pub const RECIPIENT: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f42e4e";
pub const OTHER_ACCOUNT: &str = "0x1000000000000000000000000000000000000001";
pub const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

pub fn addr(s: &str) -> Address {
    Address::parse(s).expect("valid test address")
}

pub fn ether(s: &str) -> Wei {
    Wei::parse_ether(s).expect("valid test amount")
}

#[derive(Clone, Debug)]
pub enum ConnectScript {
    Approve,
    Reject,
    Fail(String),
}

#[derive(Clone, Debug)]
pub enum SignScript {
    Accept,
    Reject,
    Fail(String),
}

#[derive(Clone, Debug)]
pub enum ConfirmScript {
    Mined,
    Reverted,
    Fail(String),
}

struct Script {
    authorized: Vec<Address>,
    connect: ConnectScript,
    sign: SignScript,
    confirm: ConfirmScript,
    network: NetworkInfo,
    balances: HashMap<Address, Wei>,
    sent: Vec<TxRequest>,
}

pub struct FakeProvider {
    present: bool,
    kind: ProviderKind,
    script: Mutex<Script>,
    events: EventHub,
    hold_signature: std::sync::atomic::AtomicBool,
    hold_confirmation: std::sync::atomic::AtomicBool,
    signature_release: Notify,
    confirmation_release: Notify,
    hold_network: std::sync::atomic::AtomicBool,
    hold_balance: std::sync::atomic::AtomicBool,
    network_release: Notify,
    balance_release: Notify,
    pub request_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub network_calls: AtomicUsize,
}

impl FakeProvider {
    /// A MetaMask-like provider with `SENDER` as its only account
    pub fn new() -> Self {
        Self::with_presence(true)
    }

    pub fn absent() -> Self {
        Self::with_presence(false)
    }

    fn with_presence(present: bool) -> Self {
        Self {
            present,
            kind: ProviderKind::MetaMask,
            script: Mutex::new(Script {
                authorized: Vec::new(),
                connect: ConnectScript::Approve,
                sign: SignScript::Accept,
                confirm: ConfirmScript::Mined,
                network: NetworkInfo {
                    name: "sepolia".to_string(),
                    chain_id: 11155111,
                },
                balances: HashMap::new(),
                sent: Vec::new(),
            }),
            events: EventHub::new(),
            hold_signature: Default::default(),
            hold_confirmation: Default::default(),
            signature_release: Notify::new(),
            confirmation_release: Notify::new(),
            hold_network: Default::default(),
            hold_balance: Default::default(),
            network_release: Notify::new(),
            balance_release: Notify::new(),
            request_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            network_calls: AtomicUsize::new(0),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn set_balance(&self, account: &str, amount: &str) {
        self.script().balances.insert(addr(account), ether(amount));
    }

    pub fn set_balance_wei(&self, account: &str, wei: Wei) {
        self.script().balances.insert(addr(account), wei);
    }

    pub fn authorize(&self, account: &str) {
        self.script().authorized.push(addr(account));
    }

    pub fn script_connect(&self, script: ConnectScript) {
        self.script().connect = script;
    }

    pub fn script_sign(&self, script: SignScript) {
        self.script().sign = script;
    }

    pub fn script_confirm(&self, script: ConfirmScript) {
        self.script().confirm = script;
    }

    pub fn set_network(&self, name: &str, chain_id: u64) {
        self.script().network = NetworkInfo {
            name: name.to_string(),
            chain_id,
        };
    }

    pub fn hold_signature(&self) {
        self.hold_signature.store(true, Ordering::SeqCst);
    }

    pub fn release_signature(&self) {
        self.signature_release.notify_one();
    }

    pub fn hold_confirmation(&self) {
        self.hold_confirmation.store(true, Ordering::SeqCst);
    }

    pub fn release_confirmation(&self) {
        self.confirmation_release.notify_one();
    }

    /// The next `get_network` answers with the network current at call time,
    /// but only after `release_network`
    pub fn hold_next_network(&self) {
        self.hold_network.store(true, Ordering::SeqCst);
    }

    pub fn release_network(&self) {
        self.network_release.notify_one();
    }

    /// Same as `hold_next_network`, for `get_balance`
    pub fn hold_next_balance(&self) {
        self.hold_balance.store(true, Ordering::SeqCst);
    }

    pub fn release_balance(&self) {
        self.balance_release.notify_one();
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.script().sent.clone()
    }

    pub fn sends(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn emit_accounts_changed(&self, accounts: &[&str]) {
        self.events
            .emit_accounts_changed(accounts.iter().map(|a| addr(a)).collect());
    }

    pub fn emit_chain_changed(&self, chain_id: u64) {
        self.events.emit_chain_changed(chain_id);
    }

    pub fn subscribers(&self) -> (usize, usize) {
        (
            self.events.accounts_subscribers(),
            self.events.chain_subscribers(),
        )
    }
}

#[async_trait]
impl ProviderGateway for FakeProvider {
    fn has_provider(&self) -> bool {
        self.present
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn request_accounts(&self, mode: AccountsMode) -> Result<Vec<Address>, GatewayError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if !self.present {
            return Err(GatewayError::NoProvider);
        }
        let mut script = self.script();
        match mode {
            AccountsMode::Silent => Ok(script.authorized.clone()),
            AccountsMode::Interactive => match script.connect.clone() {
                ConnectScript::Approve => {
                    if script.authorized.is_empty() {
                        script.authorized.push(addr(SENDER));
                    }
                    Ok(script.authorized.clone())
                }
                ConnectScript::Reject => Err(GatewayError::UserRejected),
                ConnectScript::Fail(msg) => Err(GatewayError::Provider(msg)),
            },
        }
    }

    async fn get_network(&self) -> Result<NetworkInfo, GatewayError> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        let network = self.script().network.clone();
        if self.hold_network.swap(false, Ordering::SeqCst) {
            self.network_release.notified().await;
        }
        Ok(network)
    }

    async fn get_balance(&self, address: &Address) -> Result<Wei, GatewayError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let balance = self
            .script()
            .balances
            .get(address)
            .copied()
            .unwrap_or(Wei::ZERO);
        if self.hold_balance.swap(false, Ordering::SeqCst) {
            self.balance_release.notified().await;
        }
        Ok(balance)
    }

    async fn send_transaction(&self, request: TxRequest) -> Result<TxHash, GatewayError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_signature.load(Ordering::SeqCst) {
            self.signature_release.notified().await;
        }
        let sign = self.script().sign.clone();
        match sign {
            SignScript::Accept => {
                self.script().sent.push(request);
                Ok(TxHash::new(TX_HASH))
            }
            SignScript::Reject => Err(GatewayError::UserRejected),
            SignScript::Fail(msg) => Err(GatewayError::Provider(msg)),
        }
    }

    async fn wait_for_confirmation(&self, hash: &TxHash) -> Result<Receipt, GatewayError> {
        if self.hold_confirmation.load(Ordering::SeqCst) {
            self.confirmation_release.notified().await;
        }
        let confirm = self.script().confirm.clone();
        match confirm {
            ConfirmScript::Mined => {
                let mut script = self.script();
                if let Some(request) = script.sent.last().cloned() {
                    let from = script.balances.entry(request.from).or_default();
                    *from = from.checked_sub(request.value).unwrap_or(Wei::ZERO);
                    let to = script.balances.entry(request.to).or_default();
                    *to = Wei(to.0 + request.value.0);
                }
                Ok(Receipt {
                    hash: hash.clone(),
                    block_number: 42,
                    success: true,
                })
            }
            ConfirmScript::Reverted => Ok(Receipt {
                hash: hash.clone(),
                block_number: 43,
                success: false,
            }),
            ConfirmScript::Fail(msg) => Err(GatewayError::Provider(msg)),
        }
    }

    fn subscribe_accounts_changed(&self) -> Subscription<Vec<Address>> {
        self.events.subscribe_accounts()
    }

    fn subscribe_chain_changed(&self) -> Subscription<u64> {
        self.events.subscribe_chain()
    }
}

/// Test environment: fake provider plus a controller wired to it
pub struct TestEnvironment {
    pub provider: Arc<FakeProvider>,
    pub controller: Arc<TransactionController<FakeProvider>>,
}

impl TestEnvironment {
    pub fn new() -> Self {
        init_logging();
        Self::with_provider(FakeProvider::new())
    }

    pub fn with_provider(provider: FakeProvider) -> Self {
        init_logging();
        let provider = Arc::new(provider);
        let controller = Arc::new(TransactionController::new(provider.clone()));
        Self {
            provider,
            controller,
        }
    }

    /// Connected as `SENDER` holding `balance` ether
    pub async fn connected(balance: &str) -> Self {
        let env = Self::new();
        env.provider.set_balance(SENDER, balance);
        env.controller.connect().await;
        assert_eq!(env.controller.phase(), Phase::Connected);
        env
    }

    pub fn fill_draft(&self, recipient: &str, amount: &str) {
        self.controller.set_recipient(recipient);
        self.controller.set_amount(amount);
    }

    /// Run `submit` on its own task so the test can observe in-flight states
    pub fn spawn_submit(&self) -> tokio::task::JoinHandle<()> {
        let controller = self.controller.clone();
        tokio::spawn(async move { controller.submit().await })
    }

    pub fn state(&self) -> WalletState {
        self.controller.state()
    }
}

/// Wait (bounded) until the published state satisfies `predicate`
pub async fn wait_until(
    rx: &mut watch::Receiver<WalletState>,
    predicate: impl FnMut(&WalletState) -> bool,
) -> WalletState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("controller dropped")
        .clone()
}

pub async fn wait_for_phase(rx: &mut watch::Receiver<WalletState>, phase: Phase) -> WalletState {
    wait_until(rx, |s| s.phase() == phase).await
}

/// Wait (bounded) until a call counter reaches `n`
pub async fn wait_for_calls(counter: &AtomicUsize, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while counter.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("timed out waiting for provider call");
}
