//! Types for wallet provider integration

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// EIP-1193 code for a request the user declined.
pub const USER_REJECTED_REQUEST: i64 = 4001;
/// EIP-1193 code for an unsupported method.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// JSON-RPC internal error, also used for transport failures.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error object returned by a provider request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Provider RPC error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Whether the user explicitly declined the request in the wallet UI.
    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_REQUEST
    }
}

/// Notifications pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ProviderEvent {
    /// The set of accounts exposed to the client changed. Empty means access was revoked.
    AccountsChanged(Vec<String>),
    /// The wallet switched to another chain.
    ChainChanged(String),
}

/// Wallet provider capability.
///
/// Implementors forward `request` calls to the wallet and expose its notifications as a stream.
/// The capability is injected explicitly so the rest of the client never reaches for global state.
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync {
    /// Perform an EIP-1193 style request.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    /// Subscribe to `accountsChanged` / `chainChanged` notifications.
    fn events(&self) -> BoxStream<'static, ProviderEvent>;
}

/// A provider shared between the gateway and whoever injected it.
pub type SharedProvider = Arc<dyn WalletProvider>;

/// Errors surfaced by the provider gateway
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("No wallet provider found")]
    NoProviderFound,

    #[error("Multiple wallet providers are active")]
    MultipleProvidersAmbiguous,

    #[error("Switch to network {required} was rejected (wallet is on {current})")]
    NetworkSwitchRejected { required: String, current: String },

    #[error("Switch to network {required} failed (wallet is on {current}): {error}")]
    NetworkSwitchFailed {
        required: String,
        current: String,
        error: ProviderRpcError,
    },

    #[error("User rejected the account request")]
    UserRejected,

    #[error(transparent)]
    Rpc(#[from] ProviderRpcError),
}
