/// Application configuration from environment variables
///
/// Controls the JSON-RPC endpoint, the HTTP bind address and display
/// settings. Defaults target a local development node on port 8545.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use web3_transfer::{ProviderKind, ViewConfig};

const DEFAULT_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
const DEFAULT_SESSION_PATH: &str = "./session.json";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Ethereum JSON-RPC endpoint whose node manages the accounts
    pub rpc_url: String,
    /// Block explorer base URL; derived from the chain id when unset
    pub explorer_url: Option<String>,
    /// Address the HTTP API listens on
    pub bind_address: String,
    /// File holding the persisted `{username}` session
    pub session_path: PathBuf,
    /// Receipt and event polling interval
    pub poll_interval: Duration,
    /// Wallet label shown once connected
    pub provider_kind: ProviderKind,
    pub currency_symbol: String,
    /// Comma-separated CORS origins; any origin when empty
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `RPC_URL`: JSON-RPC endpoint (default `http://localhost:8545`)
    /// - `EXPLORER_URL`: explorer base for transaction links (optional)
    /// - `BIND_ADDRESS`: API listen address (default `127.0.0.1:3000`)
    /// - `SESSION_PATH`: session file (default `./session.json`)
    /// - `POLL_INTERVAL_MS`: polling interval (default `1000`)
    /// - `PROVIDER_KIND`: `metamask`, `coinbase`, `brave` or `generic`
    /// - `CURRENCY_SYMBOL`: balance suffix (default `ETH`)
    /// - `ALLOWED_ORIGINS`: CORS origins, comma separated
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Local anvil node
    /// cargo run -p web3-wallet
    ///
    /// # Sepolia through a signer proxy
    /// RPC_URL=http://localhost:8550 CURRENCY_SYMBOL=SepoliaETH cargo run -p web3-wallet
    /// ```
    pub fn from_env() -> Self {
        let rpc_url = env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        log::info!("📡 JSON-RPC URL: {}", rpc_url);

        let explorer_url = non_empty_var("EXPLORER_URL");
        match &explorer_url {
            Some(url) => log::info!("🔗 Explorer URL: {}", url),
            None => log::info!("🔗 Explorer URL: derived from chain id"),
        }

        let bind_address =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());

        let session_path = env::var("SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_PATH));

        let poll_interval = parse_poll_interval(env::var("POLL_INTERVAL_MS").ok().as_deref());

        let provider_kind = env::var("PROVIDER_KIND")
            .map(|name| ProviderKind::from_name(&name))
            .unwrap_or_default();
        log::info!("👛 Provider: {}", provider_kind);

        let currency_symbol = non_empty_var("CURRENCY_SYMBOL").unwrap_or_else(|| "ETH".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|origins| parse_origins(&origins))
            .unwrap_or_default();

        Self {
            rpc_url,
            explorer_url,
            bind_address,
            session_path,
            poll_interval,
            provider_kind,
            currency_symbol,
            allowed_origins,
        }
    }

    /// Display settings for the presenter
    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            explorer_base: self.explorer_url.clone(),
            currency_symbol: self.currency_symbol.clone(),
            ..ViewConfig::default()
        }
    }
}

impl Default for AppConfig {
    /// Local development node defaults
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            explorer_url: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            provider_kind: ProviderKind::Generic,
            currency_symbol: "ETH".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_poll_interval(raw: Option<&str>) -> Duration {
    let millis = match raw.map(str::trim) {
        None | Some("") => DEFAULT_POLL_INTERVAL_MS,
        Some(value) => match value.parse::<u64>() {
            Ok(ms) if ms > 0 => ms,
            _ => {
                log::warn!(
                    "⚠️  Invalid POLL_INTERVAL_MS '{}', using {}ms",
                    value,
                    DEFAULT_POLL_INTERVAL_MS
                );
                DEFAULT_POLL_INTERVAL_MS
            }
        },
    };
    Duration::from_millis(millis)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
