//! Snapshot plus live-subscription synchronization engine.
//!
//! The `EventSyncEngine` fills the `WaveLedger` for one epoch at a time. A restart fetches the full
//! history, replaces the ledger, and only then registers the live `NewWave` subscription, so every
//! push lands on top of a complete snapshot. Deliveries carry the epoch their subscription was
//! created in; anything that does not match the engine's current epoch is dropped.

use super::ledger::WaveLedger;
use super::record::WaveRecord;
use crate::contract::{ContractClient, ContractError, Epoch, NEW_WAVE_EVENT, RawWave, Subscription};

use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Lifecycle of the engine within the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncState {
    /// No binding, or the binding was released
    Idle,
    /// Historical snapshot is being fetched
    Snapshotting,
    /// Snapshot applied and live subscription registered
    Live,
    /// Snapshot applied but the live stream ended; no pushes until the next epoch
    Stalled,
    /// Snapshot or subscription failed; terminal until the next epoch
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Idle => "idle",
            SyncState::Snapshotting => "snapshotting",
            SyncState::Live => "live",
            SyncState::Stalled => "stalled",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A pushed event together with the epoch of the subscription that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveDelivery {
    pub epoch: Epoch,
    pub wave: RawWave,
}

/// Keeps the ledger in step with the contract's history and live `NewWave` events.
pub struct EventSyncEngine {
    ledger: WaveLedger,
    epoch: Epoch,
    state: SyncState,
    subscription: Option<Subscription>,
}

impl Default for EventSyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSyncEngine {
    pub fn new() -> Self {
        Self {
            ledger: WaveLedger::new(),
            epoch: Epoch::default(),
            state: SyncState::Idle,
            subscription: None,
        }
    }

    pub fn ledger(&self) -> &WaveLedger {
        &self.ledger
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Whether a live subscription is registered and still delivering.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some() && self.state == SyncState::Live
    }

    /// Start a new epoch with `client`.
    ///
    /// The previous epoch's subscription is released first. On a snapshot failure the engine is
    /// `Failed` and the ledger keeps its previous contents.
    ///
    /// # Errors
    /// - `StaleEpoch` if the client's epoch is not newer than the current one
    /// - `ChainRead` if the snapshot cannot be fetched
    /// - any subscription error from the client
    pub async fn restart(&mut self, client: &mut ContractClient) -> Result<(), ContractError> {
        let offered = client.epoch();
        if offered <= self.epoch {
            warn!("Refusing restart at {} (current epoch {})", offered, self.epoch);
            return Err(ContractError::StaleEpoch {
                current: self.epoch,
                offered,
            });
        }

        self.teardown(client).await;
        self.epoch = offered;
        self.state = SyncState::Snapshotting;
        info!("Snapshotting waves for epoch {}", offered);

        let snapshot = match client.fetch_all_events().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Snapshot failed at epoch {}: {}", offered, e);
                self.state = SyncState::Failed;
                return Err(e);
            }
        };

        let fetched = snapshot.len();
        let records: Vec<WaveRecord> = snapshot.into_iter().filter_map(to_record).collect();
        self.ledger.replace(records);
        info!(
            "Applied snapshot of {} waves ({} unique) at epoch {}",
            fetched,
            self.ledger.len(),
            offered
        );

        match client.subscribe(NEW_WAVE_EVENT).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.state = SyncState::Live;
                Ok(())
            }
            Err(e) => {
                error!("Live subscription failed at epoch {}: {}", offered, e);
                self.state = SyncState::Failed;
                Err(e)
            }
        }
    }

    /// Wait for the next pushed event of the current subscription.
    ///
    /// Returns `None` when there is no delivering subscription. An ended stream moves the engine to
    /// `Stalled`; its registration is kept so `teardown` still releases it.
    pub async fn next_delivery(&mut self) -> Option<LiveDelivery> {
        loop {
            if self.state != SyncState::Live {
                return None;
            }
            let subscription = self.subscription.as_mut()?;
            match subscription.next().await {
                Some(Ok(wave)) => {
                    return Some(LiveDelivery {
                        epoch: subscription.epoch(),
                        wave,
                    });
                }
                Some(Err(e)) => {
                    warn!("Skipping undecodable live event: {}", e);
                }
                None => {
                    warn!("Live stream for epoch {} ended", subscription.epoch());
                    self.state = SyncState::Stalled;
                    return None;
                }
            }
        }
    }

    /// Merge a pushed event into the ledger. Returns whether the ledger changed.
    pub fn apply_live(&mut self, delivery: LiveDelivery) -> bool {
        if delivery.epoch != self.epoch {
            debug!(
                "Discarding delivery from epoch {} (current {})",
                delivery.epoch, self.epoch
            );
            return false;
        }
        if self.state != SyncState::Live {
            debug!("Discarding delivery while {}", self.state);
            return false;
        }

        let Some(record) = to_record(delivery.wave) else {
            return false;
        };
        let inserted = self.ledger.insert_if_absent(record);
        if inserted {
            debug!("Live wave added, ledger has {} entries", self.ledger.len());
        } else {
            debug!("Live wave already present");
        }
        inserted
    }

    /// Release the live subscription, if any. The ledger and state are left as they are.
    pub async fn teardown(&mut self, client: &mut ContractClient) {
        if let Some(subscription) = self.subscription.take() {
            let epoch = subscription.epoch();
            if let Err(e) = client.unsubscribe(subscription).await {
                warn!("Failed to release subscription of epoch {}: {}", epoch, e);
            }
        }
    }

    /// Mark the current epoch failed without restarting, e.g. when the wallet stays on the wrong
    /// network. Cleared by the next successful `restart`.
    pub(crate) fn mark_failed(&mut self) {
        self.state = SyncState::Failed;
    }

    /// Release the live subscription and return to `Idle`. The last ledger stays visible.
    pub async fn shutdown(&mut self, client: &mut ContractClient) {
        self.teardown(client).await;
        self.state = SyncState::Idle;
        info!("Sync engine idle at epoch {}", self.epoch);
    }
}

fn to_record(wave: RawWave) -> Option<WaveRecord> {
    match WaveRecord::try_from(wave) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping wave: {}", e);
            None
        }
    }
}
