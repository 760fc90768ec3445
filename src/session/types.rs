use crate::contract::ContractError;
use crate::provider::ProviderError;

use serde::Serialize;

/// Wallet session as seen by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
	account: Option<String>,
	chain_id: Option<String>,
}

impl Session {
	pub fn account(&self) -> Option<&str> {
		self.account.as_deref()
	}

	/// Hex chain id last observed from the provider.
	pub fn chain_id(&self) -> Option<&str> {
		self.chain_id.as_deref()
	}

	pub fn is_connected(&self) -> bool {
		self.account.is_some()
	}

	pub(crate) fn set_account(&mut self, account: Option<String>) {
		self.account = account;
	}

	pub(crate) fn set_chain_id(&mut self, chain_id: Option<String>) {
		self.chain_id = chain_id;
	}
}

/// Message shown to the user when an operation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserNotice {
	pub message: String,
}

impl UserNotice {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// Errors surfaced by `SessionController` operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
	#[error("Provider error: {0}")]
	Provider(#[from] ProviderError),

	#[error("Contract error: {0}")]
	Contract(#[from] ContractError),

	#[error("No account connected")]
	NotConnected,

	#[error("Another operation is already in progress")]
	OperationInProgress,
}

impl SessionError {
	/// User-facing description of the failure.
	pub fn notice(&self) -> UserNotice {
		let message = match self {
			SessionError::Provider(ProviderError::NoProviderFound) => {
				"Get a wallet! No Ethereum provider was found.".to_string()
			}
			SessionError::Provider(ProviderError::MultipleProvidersAmbiguous) => {
				"Several wallets are installed. Disable all but one and reload.".to_string()
			}
			SessionError::Provider(ProviderError::NetworkSwitchRejected { required, .. }) => {
				format!("Please switch your wallet to network {} manually.", required)
			}
			SessionError::Provider(ProviderError::NetworkSwitchFailed { required, error, .. }) => {
				format!(
					"Could not switch your wallet to network {} ({}). Please switch manually.",
					required, error.message
				)
			}
			SessionError::Provider(ProviderError::UserRejected) => {
				"Connection request was declined.".to_string()
			}
			SessionError::Provider(ProviderError::Rpc(e)) => format!("Wallet error: {}", e.message),
			SessionError::Contract(ContractError::TransactionRejected(_)) => {
				"Transaction was declined.".to_string()
			}
			SessionError::Contract(ContractError::TransactionReverted(_)) => {
				"The wave transaction failed on chain.".to_string()
			}
			SessionError::Contract(ContractError::ChainRead(_)) => {
				"Could not load waves from the contract.".to_string()
			}
			SessionError::Contract(e) => format!("Contract error: {}", e),
			SessionError::NotConnected => "Connect your wallet first.".to_string(),
			SessionError::OperationInProgress => "Please wait for the current operation.".to_string(),
		};
		UserNotice::new(message)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_session_is_connected_with_account() {
		let mut session = Session::default();
		assert!(!session.is_connected());
		session.set_account(Some("0xABC".to_string()));
		assert!(session.is_connected());
		assert_eq!(session.account(), Some("0xABC"));
		session.set_account(None);
		assert!(!session.is_connected());
	}

	#[test]
	fn test_network_notice_names_required_chain() {
		let err = SessionError::from(ProviderError::NetworkSwitchRejected {
			required: "0xaa36a7".to_string(),
			current: "0x1".to_string(),
		});
		assert!(err.notice().message.contains("0xaa36a7"));
	}

	#[test]
	fn test_failed_switch_notice_carries_wallet_message() {
		let err = SessionError::from(ProviderError::NetworkSwitchFailed {
			required: "0xaa36a7".to_string(),
			current: "0x89".to_string(),
			error: crate::provider::ProviderRpcError::new(4902, "Unrecognized chain ID"),
		});
		let message = err.notice().message;
		assert!(message.contains("0xaa36a7"));
		assert!(message.contains("Unrecognized chain ID"));
	}
}
