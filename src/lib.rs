//! Wallet session and `NewWave` event synchronization client.
//!
//! The crate keeps three pieces of client state consistent with two external sources of truth:
//! the wallet provider (account and chain) and the wave portal contract (historical and live
//! `NewWave` events).
//!
//! - `provider`: wallet provider capability, detection and network enforcement.
//! - `contract`: the wave portal contract capability and the epoch-bound `ContractClient`.
//! - `waves`: wave records, the de-duplicated ledger and the snapshot/live sync engine.
//! - `session`: the controller that owns the session, the loading flag and all rebinding.

/// Runtime configuration
pub mod config;
/// Wave portal contract access
pub mod contract;
/// Wallet provider access
pub mod provider;
/// Session orchestration and presentation boundary
pub mod session;
/// Display helpers
pub mod utils;
/// Wave records, ledger and synchronization engine
pub mod waves;

/// In-memory wallet and contract doubles
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use config::ClientConfig;
pub use session::SessionController;
