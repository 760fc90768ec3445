//! Wallet provider integration
//!
//! This module provides the capability trait for a wallet provider (the injected object granting
//! account identity and chain access), the gateway that detects and validates it, and a JSON-RPC
//! implementation of the capability for talking to a node directly.

/// Provider detection, network enforcement and account queries
mod gateway;
/// JSON-RPC transport and provider implementation
pub mod rpc;
/// Capability trait, notifications and error types
mod types;

pub use gateway::ProviderGateway;
pub use types::*;
