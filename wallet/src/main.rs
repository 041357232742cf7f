use std::sync::Arc;

use web3_transfer::{Presenter, TransactionController};
use web3_wallet::api::{self, AppState};
use web3_wallet::{AppConfig, FileSessionStore, JsonRpcProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger (set RUST_LOG=debug for verbose output, RUST_LOG=info for normal)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();

    let sessions = FileSessionStore::new(config.session_path.clone());
    let session = match sessions.load() {
        Ok(session) => session,
        Err(e) => {
            log::warn!(
                "⚠️  Ignoring unreadable session file {}: {}",
                sessions.path().display(),
                e
            );
            None
        }
    };
    if let Some(session) = &session {
        log::info!("👤 Restored session for {}", session.username);
    }

    let provider = Arc::new(JsonRpcProvider::new(
        config.rpc_url.clone(),
        config.provider_kind,
        config.poll_interval,
    ));
    let controller = Arc::new(TransactionController::new(provider.clone()));

    let _listener = controller.spawn_event_listener();
    let poller = provider.spawn_event_poller();
    controller.init().await;

    let presenter = Presenter::new(controller, config.view_config());
    let state = Arc::new(AppState::new(presenter, sessions, session));

    log::info!("Starting web3 wallet server on {}", config.bind_address);
    api::start_server(&config, state).await?;

    poller.shutdown().await;
    Ok(())
}
