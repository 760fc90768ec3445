use super::types::*;

/// Wave portal contract capability.
///
/// Implementations cover the contract's read path, its single state-changing call, mining
/// confirmation and the `NewWave` event stream.
#[async_trait::async_trait]
pub trait WavePortal: Send + Sync {
	/// Full historical snapshot, in contract (append) order.
	async fn get_all_waves(&self) -> Result<Vec<RawWave>, ContractError>;

	/// The contract's running wave counter.
	async fn get_total_waves(&self) -> Result<u64, ContractError>;

	/// Send `wave(message)` from `from` with the given gas limit.
	async fn wave(&self, from: &str, message: &str, gas_limit: u64)
	-> Result<TxHandle, ContractError>;

	/// Suspend until `tx` is mined.
	async fn wait(&self, tx: &TxHandle) -> Result<TxReceipt, ContractError>;

	/// Register a live stream for `event`.
	async fn watch(&self, event: &str) -> Result<(SubscriptionId, WaveStream), ContractError>;

	/// Release a registration made by `watch`.
	async fn unwatch(&self, id: SubscriptionId) -> Result<(), ContractError>;
}
