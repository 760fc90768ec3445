//! Wave portal contract integration
//!
//! This module provides the contract capability (`WavePortal`), its JSON-RPC implementation, and
//! the epoch-bound `ContractClient` handle that the rest of the client talks to.

/// Solidity ABI of the wave portal
pub mod abi;
/// Signer-scoped contract handle
mod client;
/// Contract capability trait
mod portal;
/// JSON-RPC / WebSocket implementation of the contract capability
pub mod rpc;
/// Raw event, transaction and subscription types
mod types;

pub use abi::NEW_WAVE_EVENT;
pub use client::ContractClient;
pub use portal::WavePortal;
pub use types::*;
