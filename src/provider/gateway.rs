//! Wallet provider gateway.
//!
//! The gateway answers three questions for the session controller: is there exactly one wallet
//! provider, is it on the required network, and which account (if any) it exposes. It never
//! mutates session state; callers apply its results.

use super::types::*;
use crate::config::normalize_chain_id;

use futures::stream::BoxStream;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Gateway over the injected wallet provider.
#[derive(Clone)]
pub struct ProviderGateway {
    /// The provider injected into the global slot, if any.
    injected: Option<SharedProvider>,
    /// The provider discovered by detection, if any.
    detected: Option<SharedProvider>,
}

impl ProviderGateway {
    /// Create a gateway for a single injected provider that is also the detected one.
    pub fn new(injected: Option<SharedProvider>) -> Self {
        Self {
            detected: injected.clone(),
            injected,
        }
    }

    /// Create a gateway where detection and the global slot may disagree.
    pub fn with_detected(injected: Option<SharedProvider>, detected: Option<SharedProvider>) -> Self {
        Self { injected, detected }
    }

    /// Return the uniquely injected provider.
    ///
    /// # Errors
    /// `NoProviderFound` when nothing was detected, `MultipleProvidersAmbiguous` when the detected
    /// provider is not the same object as the one in the global slot.
    pub fn detect(&self) -> Result<SharedProvider, ProviderError> {
        let detected = self.detected.as_ref().ok_or(ProviderError::NoProviderFound)?;

        let same_object = self.injected.as_ref().is_some_and(|injected| {
            std::ptr::addr_eq(Arc::as_ptr(injected), Arc::as_ptr(detected))
        });
        if !same_object {
            warn!("Detected provider differs from the injected one; multiple wallets active");
            return Err(ProviderError::MultipleProvidersAmbiguous);
        }

        Ok(detected.clone())
    }

    /// Query the chain the wallet is currently on, normalized to lower-case hex.
    pub async fn current_chain_id(&self) -> Result<String, ProviderError> {
        let provider = self.detect()?;
        let value = provider.request("eth_chainId", json!([])).await?;
        let raw = value.as_str().ok_or_else(|| {
            ProviderRpcError::new(INTERNAL_ERROR, format!("Malformed eth_chainId result: {}", value))
        })?;
        Ok(normalize_chain_id(raw).unwrap_or_else(|| raw.to_lowercase()))
    }

    /// Make sure the wallet is on `required_chain_id`, asking it to switch if it is not.
    ///
    /// Returns the chain id the wallet ends up on. A user declining the switch is reported as
    /// `NetworkSwitchRejected` so the caller can prompt for a manual switch; any other switch
    /// failure is `NetworkSwitchFailed`. Both carry the chain the wallet is still on.
    pub async fn ensure_network(&self, required_chain_id: &str) -> Result<String, ProviderError> {
        let required =
            normalize_chain_id(required_chain_id).unwrap_or_else(|| required_chain_id.to_lowercase());
        let current = self.current_chain_id().await?;
        if current == required {
            debug!("Wallet already on required chain {}", required);
            return Ok(current);
        }

        info!("Wallet on chain {}, requesting switch to {}", current, required);
        let provider = self.detect()?;
        match provider
            .request("wallet_switchEthereumChain", json!([{ "chainId": required }]))
            .await
        {
            Ok(_) => {
                info!("Switched wallet to chain {}", required);
                Ok(required)
            }
            Err(e) if e.is_user_rejection() => {
                warn!("User rejected switching to chain {}", required);
                Err(ProviderError::NetworkSwitchRejected { required, current })
            }
            Err(error) => {
                warn!("Switching to chain {} failed: {}", required, error);
                Err(ProviderError::NetworkSwitchFailed {
                    required,
                    current,
                    error,
                })
            }
        }
    }

    /// First already-authorized account, without prompting.
    pub async fn get_authorized_account(&self) -> Result<Option<String>, ProviderError> {
        let provider = self.detect()?;
        let accounts = parse_accounts(provider.request("eth_accounts", json!([])).await?)?;
        match accounts.into_iter().next() {
            Some(account) => {
                info!("Found an authorized account: {}", account);
                Ok(Some(account))
            }
            None => {
                info!("No authorized account found");
                Ok(None)
            }
        }
    }

    /// Prompt the wallet for account access.
    pub async fn request_account(&self) -> Result<String, ProviderError> {
        let provider = self.detect()?;
        let accounts = match provider.request("eth_requestAccounts", json!([])).await {
            Ok(value) => parse_accounts(value)?,
            Err(e) if e.is_user_rejection() => return Err(ProviderError::UserRejected),
            Err(e) => return Err(e.into()),
        };

        let account = accounts
            .into_iter()
            .next()
            .ok_or(ProviderError::UserRejected)?;
        info!("Connected {}", account);
        Ok(account)
    }

    /// Notifications from the detected provider.
    pub fn events(&self) -> Result<BoxStream<'static, ProviderEvent>, ProviderError> {
        Ok(self.detect()?.events())
    }
}

fn parse_accounts(value: Value) -> Result<Vec<String>, ProviderError> {
    serde_json::from_value::<Vec<String>>(value).map_err(|e| {
        ProviderError::Rpc(ProviderRpcError::new(
            INTERNAL_ERROR,
            format!("Malformed account list: {}", e),
        ))
    })
}
