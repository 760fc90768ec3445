//! Client configuration.
//!
//! The required network and the contract location are deployment constants. They are read from
//! the environment by the binary and passed explicitly to everything that needs them.

use alloy_primitives::Address;
use std::time::Duration;

/// Sepolia
pub const DEFAULT_CHAIN_ID: &str = "0xaa36a7";
/// Gas limit attached to every `wave` transaction.
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8545";

pub const ENV_CONTRACT_ADDRESS: &str = "WAVE_PORTAL_CONTRACT_ADDRESS";
pub const ENV_CHAIN_ID: &str = "WAVE_PORTAL_CHAIN_ID";
pub const ENV_RPC_URL: &str = "WAVE_PORTAL_RPC_URL";
pub const ENV_WS_URL: &str = "WAVE_PORTAL_WS_URL";
pub const ENV_GAS_LIMIT: &str = "WAVE_PORTAL_GAS_LIMIT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Configuration shared by the provider gateway, the contract adapters and the session controller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hex chain id the session must be on, e.g. `0xaa36a7`.
    pub chain_id: String,
    /// Address of the deployed wave portal contract.
    pub contract_address: String,
    /// JSON-RPC HTTP endpoint.
    pub rpc_url: String,
    /// JSON-RPC WebSocket endpoint used for log subscriptions.
    pub ws_url: String,
    /// Gas limit for `wave` transactions.
    pub gas_limit: u64,
    /// How often the JSON-RPC provider polls for account and chain changes.
    pub poll_interval: Duration,
    /// How often a pending transaction's receipt is polled.
    pub receipt_poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            contract_address: String::new(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            gas_limit: DEFAULT_GAS_LIMIT,
            poll_interval: Duration::from_secs(2),
            receipt_poll_interval: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Only the contract address is required; everything else falls back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let contract_address =
            lookup(ENV_CONTRACT_ADDRESS).ok_or(ConfigError::Missing(ENV_CONTRACT_ADDRESS))?;
        contract_address
            .trim()
            .parse::<Address>()
            .map_err(|e| ConfigError::Invalid {
                name: ENV_CONTRACT_ADDRESS,
                reason: e.to_string(),
            })?;
        config.contract_address = contract_address.trim().to_string();

        if let Some(chain_id) = lookup(ENV_CHAIN_ID) {
            config.chain_id =
                normalize_chain_id(&chain_id).ok_or_else(|| ConfigError::Invalid {
                    name: ENV_CHAIN_ID,
                    reason: format!("'{}' is not a hex chain id", chain_id),
                })?;
        }

        if let Some(rpc_url) = lookup(ENV_RPC_URL) {
            config.rpc_url = rpc_url;
        }

        if let Some(ws_url) = lookup(ENV_WS_URL) {
            config.ws_url = ws_url;
        }

        if let Some(gas_limit) = lookup(ENV_GAS_LIMIT) {
            config.gas_limit = gas_limit.trim().parse().map_err(|e| ConfigError::Invalid {
                name: ENV_GAS_LIMIT,
                reason: format!("{}", e),
            })?;
        }

        Ok(config)
    }
}

/// Lower-case a `0x`-prefixed hex chain id, rejecting anything that is not one.
pub fn normalize_chain_id(raw: &str) -> Option<String> {
    let digits = raw.trim().strip_prefix("0x").or_else(|| raw.trim().strip_prefix("0X"))?;
    let value = u64::from_str_radix(digits, 16).ok()?;
    Some(format!("0x{:x}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const PORTAL: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_address_is_set() {
        let config = ClientConfig::from_lookup(lookup_from(&[(ENV_CONTRACT_ADDRESS, PORTAL)]))
            .expect("config should load");
        assert_eq!(config.contract_address, PORTAL);
        assert_eq!(config.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(config.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
    }

    #[test]
    fn test_missing_address_is_an_error() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENV_CONTRACT_ADDRESS)));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_CONTRACT_ADDRESS, PORTAL),
            (ENV_CHAIN_ID, "0X7A69"),
            (ENV_GAS_LIMIT, "500000"),
            (ENV_WS_URL, "ws://node:8546"),
        ]))
        .expect("config should load");
        assert_eq!(config.chain_id, "0x7a69");
        assert_eq!(config.gas_limit, 500_000);
        assert_eq!(config.ws_url, "ws://node:8546");
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            (ENV_CONTRACT_ADDRESS, PORTAL),
            (ENV_CHAIN_ID, "31337"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: ENV_CHAIN_ID, .. }));

        let err = ClientConfig::from_lookup(lookup_from(&[(ENV_CONTRACT_ADDRESS, "0x1234")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: ENV_CONTRACT_ADDRESS, .. }));
    }

    #[test]
    fn test_normalize_chain_id() {
        assert_eq!(normalize_chain_id("0xAA36A7").as_deref(), Some("0xaa36a7"));
        assert_eq!(normalize_chain_id("0x01").as_deref(), Some("0x1"));
        assert_eq!(normalize_chain_id("1"), None);
        assert_eq!(normalize_chain_id("0xzz"), None);
    }
}
