//! Signer-scoped wave portal handle.
//!
//! A `ContractClient` is produced by `bind` for one signer and one epoch. Rebinding always builds
//! a new client; an existing client is never re-pointed at another signer.

use super::portal::WavePortal;
use super::types::*;

use std::collections::HashMap;
use std::sync::Arc;

/// Handle to the wave portal bound to a signer and an epoch
pub struct ContractClient {
	portal: Arc<dyn WavePortal>,
	signer: Signer,
	epoch: Epoch,
	/// Live registrations made through this handle, by event name.
	subscriptions: HashMap<String, SubscriptionId>,
}

impl ContractClient {
	/// Bind the contract capability to `signer` for `epoch`.
	pub fn bind(portal: Arc<dyn WavePortal>, signer: Signer, epoch: Epoch) -> Self {
		log::info!("Binding wave portal to {} at epoch {}", signer.account(), epoch);
		Self {
			portal,
			signer,
			epoch,
			subscriptions: HashMap::new(),
		}
	}

	pub fn epoch(&self) -> Epoch {
		self.epoch
	}

	/// Fetch the full historical snapshot in contract order.
	pub async fn fetch_all_events(&self) -> Result<Vec<RawWave>, ContractError> {
		let waves = self.portal.get_all_waves().await.map_err(into_read_error)?;
		log::debug!("Fetched {} waves at epoch {}", waves.len(), self.epoch);
		Ok(waves)
	}

	/// Read the contract's wave counter.
	pub async fn total_waves(&self) -> Result<u64, ContractError> {
		self.portal.get_total_waves().await.map_err(into_read_error)
	}

	/// Send a `wave` transaction. The returned handle is not yet mined.
	pub async fn submit_wave(&self, message: &str, gas_limit: u64) -> Result<TxHandle, ContractError> {
		log::info!(
			"Submitting wave from {} (gas limit {})",
			self.signer.account(),
			gas_limit
		);
		self.portal
			.wave(self.signer.account(), message, gas_limit)
			.await
	}

	/// Suspend until `tx` is mined.
	pub async fn confirm(&self, tx: &TxHandle) -> Result<TxReceipt, ContractError> {
		let receipt = self.portal.wait(tx).await?;
		log::info!("Transaction {} mined in block {:?}", receipt.hash, receipt.block_number);
		Ok(receipt)
	}

	/// Register a live stream for `event`.
	///
	/// # Errors
	/// `AlreadySubscribed` if this handle already holds a registration for `event`.
	pub async fn subscribe(&mut self, event: &str) -> Result<Subscription, ContractError> {
		if self.subscriptions.contains_key(event) {
			log::error!("Duplicate subscription to {} at epoch {}", event, self.epoch);
			return Err(ContractError::AlreadySubscribed(event.to_string()));
		}

		let (id, stream) = self.portal.watch(event).await?;
		self.subscriptions.insert(event.to_string(), id);
		log::info!("Subscribed to {} as {:?} at epoch {}", event, id, self.epoch);
		Ok(Subscription::new(id, event.to_string(), self.epoch, stream))
	}

	/// Release a live registration.
	///
	/// Handles created by an earlier binding of the same capability are accepted too; the
	/// registration is released at the capability either way.
	pub async fn unsubscribe(&mut self, subscription: Subscription) -> Result<(), ContractError> {
		let id = subscription.id();
		if self.subscriptions.get(subscription.event()) == Some(&id) {
			self.subscriptions.remove(subscription.event());
		}
		drop(subscription);

		self.portal.unwatch(id).await?;
		log::info!("Unsubscribed {:?}", id);
		Ok(())
	}

	/// Number of live registrations held by this handle.
	pub fn active_subscriptions(&self) -> usize {
		self.subscriptions.len()
	}
}

fn into_read_error(error: ContractError) -> ContractError {
	match error {
		ContractError::ChainRead(_) => error,
		other => ContractError::ChainRead(other.to_string()),
	}
}
