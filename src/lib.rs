//! web3-transfer: wallet connection and native-currency transfers
//!
//! This crate coordinates an injected, user-mediated wallet provider: it
//! connects, tracks balance and network, validates a single native-currency
//! transfer and follows it through signature, broadcast and confirmation.
//!
//! # Architecture
//!
//! - **ProviderGateway**: async capability trait over the wallet (injected)
//! - **Validator**: ordered, pure checks on the transfer draft
//! - **TransactionController**: the connection/transaction state machine,
//!   publishing `WalletState` on a watch channel
//! - **Presenter / WalletView**: display projection and user-action mapping
//!
//! Amounts are fixed-point integers (`Wei`); floating point is never used.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use web3_transfer::{Presenter, TransactionController, UserAction, ViewConfig};
//!
//! let controller = Arc::new(TransactionController::new(Arc::new(provider)));
//! let _events = controller.spawn_event_listener();
//! controller.init().await;
//!
//! let presenter = Presenter::new(controller.clone(), ViewConfig::default());
//! presenter.dispatch(UserAction::Connect).await;
//! presenter.dispatch(UserAction::EditRecipient("0x742d...".into())).await;
//! presenter.dispatch(UserAction::EditAmount("0.01".into())).await;
//! presenter.dispatch(UserAction::Submit).await;
//! println!("{:?}", presenter.view().status);
//! ```

// Public modules
pub mod address;
pub mod amount;
pub mod controller;
pub mod error;
pub mod provider;
pub mod state;
pub mod validator;
pub mod view;

// Re-exports for convenience
pub use address::Address;
pub use amount::Wei;
pub use controller::{EventListener, TransactionController};
pub use error::{AddressError, AmountError, ErrorKind, GatewayError};
pub use provider::{
    network_name, AccountsMode, EventHub, NetworkInfo, ProviderGateway, ProviderKind, Receipt,
    Subscription, TxHash, TxRequest,
};
pub use state::{
    AttemptStatus, BalanceSnapshot, ChainSnapshot, ConnectionState, ErrorOrigin, Phase,
    TransactionAttempt, TransactionDraft, WalletState,
};
pub use validator::{validate_transfer, ValidatedTransfer};
pub use view::{
    error_message, explorer_tx_url, ActionOutcome, Presenter, UserAction, ViewConfig, WalletView,
};
