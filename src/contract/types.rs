//! Types for wave portal contract access

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `NewWave` event or a `getAllWaves` entry as the contract returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWave {
	/// Address of the account that waved.
	pub waver: String,
	/// Block timestamp in seconds since the Unix epoch.
	pub timestamp: u64,
	/// Message attached to the wave.
	pub message: String,
}

/// Handle of a submitted, not yet confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
	pub hash: String,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
	pub hash: String,
	#[serde(rename = "blockNumber")]
	pub block_number: Option<u64>,
}

/// The account transactions are sent from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
	account: String,
}

impl Signer {
	pub fn new(account: impl Into<String>) -> Self {
		Self {
			account: account.into(),
		}
	}

	pub fn account(&self) -> &str {
		&self.account
	}
}

/// Identifier of one contract binding. Every rebind gets a strictly larger epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Epoch(u64);

impl Epoch {
	pub fn new(value: u64) -> Self {
		Self(value)
	}

	pub fn next(self) -> Self {
		Self(self.0 + 1)
	}
}

impl fmt::Display for Epoch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Identifier of a live event registration at the contract capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Stream of decoded live events.
pub type WaveStream = BoxStream<'static, Result<RawWave, ContractError>>;

/// An explicit live-event registration.
///
/// The subscription remembers the epoch of the client that created it; everything it delivers is
/// attributed to that epoch. It is released with `ContractClient::unsubscribe`.
pub struct Subscription {
	id: SubscriptionId,
	event: String,
	epoch: Epoch,
	stream: WaveStream,
}

impl Subscription {
	pub(crate) fn new(id: SubscriptionId, event: String, epoch: Epoch, stream: WaveStream) -> Self {
		Self {
			id,
			event,
			epoch,
			stream,
		}
	}

	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	pub fn event(&self) -> &str {
		&self.event
	}

	pub fn epoch(&self) -> Epoch {
		self.epoch
	}

	/// Wait for the next pushed event. `None` once the source has closed.
	pub async fn next(&mut self) -> Option<Result<RawWave, ContractError>> {
		self.stream.next().await
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("event", &self.event)
			.field("epoch", &self.epoch)
			.finish_non_exhaustive()
	}
}

/// Error types for contract reads, writes and subscriptions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
	#[error("Chain read error: {0}")]
	ChainRead(String),

	#[error("Chain write error: {0}")]
	ChainWrite(String),

	#[error("Transaction rejected: {0}")]
	TransactionRejected(String),

	#[error("Transaction reverted: {0}")]
	TransactionReverted(String),

	#[error("Already subscribed to {0}")]
	AlreadySubscribed(String),

	#[error("Subscription {0:?} is not registered")]
	NotSubscribed(SubscriptionId),

	#[error("Binding {offered} is not newer than current binding {current}")]
	StaleEpoch { current: Epoch, offered: Epoch },
}
