//! Wave records and their synchronization.
//!
//! - `record`: the immutable `WaveRecord` and its de-duplication key.
//! - `ledger`: the ordered, de-duplicated collection shown to the user.
//! - `sync`: the engine that fills the ledger from a snapshot and keeps it live.

/// Immutable wave values
pub mod record;
/// Ordered, de-duplicated wave collection
pub mod ledger;
/// Snapshot plus live-subscription synchronization engine
pub mod sync;

pub use ledger::WaveLedger;
pub use record::{InvalidTimestamp, WaveKey, WaveRecord};
pub use sync::{EventSyncEngine, LiveDelivery, SyncState};
