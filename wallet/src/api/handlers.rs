use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Duration;

use web3_transfer::{ActionOutcome, ProviderGateway, UserAction, WalletView};

use super::server::AppState;
use super::types::{DraftRequest, LoginRequest, SessionResponse};
use crate::error::AppError;
use crate::session::Session;

/// Upper bound on how long submit waits for validation to publish
const SUBMIT_SETTLE: Duration = Duration::from_secs(1);

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn get_session_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
) -> Json<SessionResponse> {
    Json(SessionResponse {
        username: state.session().map(|s| s.username),
    })
}

pub async fn login_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(AppError::InvalidInput("username must not be empty".to_string()));
    }

    let session = Session {
        username: username.to_string(),
    };
    state.sessions.save(&session)?;
    state.set_session(Some(session));
    log::info!("👤 Logged in as {}", username);

    Ok(Json(SessionResponse {
        username: Some(username.to_string()),
    }))
}

pub async fn logout_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<Json<SessionResponse>, AppError> {
    state.sessions.clear()?;
    state.set_session(None);
    log::info!("👋 Logged out");
    Ok(Json(SessionResponse { username: None }))
}

pub async fn get_wallet_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
) -> Json<WalletView> {
    Json(state.presenter.view())
}

pub async fn connect_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
) -> Json<WalletView> {
    state.presenter.dispatch(UserAction::Connect).await;
    Json(state.presenter.view())
}

pub async fn disconnect_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
) -> Json<WalletView> {
    state.presenter.dispatch(UserAction::Disconnect).await;
    Json(state.presenter.view())
}

pub async fn update_draft_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<WalletView>, AppError> {
    if !state.presenter.controller().state().is_connected() {
        return Err(AppError::NotConnected(
            "connect a wallet before editing the transfer".to_string(),
        ));
    }

    if let Some(recipient) = req.recipient {
        state
            .presenter
            .dispatch(UserAction::EditRecipient(recipient))
            .await;
    }
    if let Some(amount) = req.amount {
        state.presenter.dispatch(UserAction::EditAmount(amount)).await;
    }
    Ok(Json(state.presenter.view()))
}

/// Start the transfer in the background
///
/// Returns once validation has been applied (error or a started attempt);
/// progress is then observed through `GET /api/wallet`.
pub async fn submit_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<Json<WalletView>, AppError> {
    let controller = state.presenter.controller();
    let snapshot = controller.state();
    if !snapshot.is_connected() {
        return Err(AppError::NotConnected(
            "connect a wallet before sending".to_string(),
        ));
    }
    if snapshot.has_attempt_in_flight() {
        return Ok(Json(state.presenter.view()));
    }

    let mut updates = controller.subscribe();

    let task_state = Arc::clone(&state);
    tokio::spawn(async move {
        task_state.presenter.dispatch(UserAction::Submit).await;
    });

    if tokio::time::timeout(SUBMIT_SETTLE, updates.changed())
        .await
        .is_err()
    {
        log::debug!("submit: no state change within {:?}", SUBMIT_SETTLE);
    }
    Ok(Json(state.presenter.view()))
}

pub async fn cancel_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
) -> Json<WalletView> {
    state.presenter.dispatch(UserAction::Cancel).await;
    Json(state.presenter.view())
}

pub async fn dismiss_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
) -> Json<WalletView> {
    state.presenter.dispatch(UserAction::Dismiss).await;
    Json(state.presenter.view())
}

/// Connected address as plain text, exactly as the provider reported it
pub async fn copy_address_handler<P: ProviderGateway>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<String, AppError> {
    match state.presenter.dispatch(UserAction::CopyAddress).await {
        ActionOutcome::Copied(address) => Ok(address),
        _ => Err(AppError::NotConnected("no wallet connected".to_string())),
    }
}
