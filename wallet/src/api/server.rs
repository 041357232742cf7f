use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use std::sync::{Arc, PoisonError, RwLock};
use tower_http::cors::{Any, CorsLayer};

use web3_transfer::{Presenter, ProviderGateway};

use super::handlers;
use crate::config::AppConfig;
use crate::session::{FileSessionStore, Session};

/// Shared state behind every handler
pub struct AppState<P: ProviderGateway> {
    pub presenter: Presenter<P>,
    pub sessions: FileSessionStore,
    session: RwLock<Option<Session>>,
}

impl<P: ProviderGateway> AppState<P> {
    /// `session` is the record loaded at startup, if any
    pub fn new(
        presenter: Presenter<P>,
        sessions: FileSessionStore,
        session: Option<Session>,
    ) -> Self {
        Self {
            presenter,
            sessions,
            session: RwLock::new(session),
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

/// CORS for the configured origins, or any origin when none are set
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origin_list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("⚠️  Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origin_list.is_empty() {
        log::warn!("CORS: Allowing all origins (development mode). Set ALLOWED_ORIGINS env var for production.");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    log::info!("CORS configured for origins: {}", origins.join(","));
    CorsLayer::new()
        .allow_origin(origin_list)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_router<P: ProviderGateway>(state: Arc<AppState<P>>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Session routes
        .route(
            "/api/session",
            get(handlers::get_session_handler::<P>)
                .post(handlers::login_handler::<P>)
                .delete(handlers::logout_handler::<P>),
        )
        // Wallet routes
        .route("/api/wallet", get(handlers::get_wallet_handler::<P>))
        .route("/api/wallet/connect", post(handlers::connect_handler::<P>))
        .route(
            "/api/wallet/disconnect",
            post(handlers::disconnect_handler::<P>),
        )
        .route("/api/wallet/draft", put(handlers::update_draft_handler::<P>))
        .route("/api/wallet/submit", post(handlers::submit_handler::<P>))
        .route("/api/wallet/cancel", post(handlers::cancel_handler::<P>))
        .route("/api/wallet/dismiss", post(handlers::dismiss_handler::<P>))
        .route(
            "/api/wallet/address",
            get(handlers::copy_address_handler::<P>),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn start_server<P: ProviderGateway>(
    config: &AppConfig,
    state: Arc<AppState<P>>,
) -> anyhow::Result<()> {
    let app = create_router(state, cors_layer(&config.allowed_origins));

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    log::info!("Server listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            log::info!("Received SIGTERM signal");
        },
    }

    log::info!("Shutdown signal received, exiting gracefully...");
}
