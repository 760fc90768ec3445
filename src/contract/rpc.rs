//!
//! JSON-RPC implementation of the wave portal capability.
//!
//! Reads go through `eth_call`, writes through `eth_sendTransaction` on the node's managed
//! accounts, confirmation polls `eth_getTransactionReceipt`, and live events use an
//! `eth_subscribe("logs")` subscription over a dedicated WebSocket connection per registration.

use super::abi;
use super::portal::WavePortal;
use super::types::*;
use crate::provider::rpc::{JsonRpcClient, TransportError};
use crate::provider::USER_REJECTED_REQUEST;

use alloy_primitives::{Address, B256, Bytes};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Wave portal reached through a node's JSON-RPC endpoints
pub struct RpcWavePortal {
	/// HTTP transport for calls and transactions.
	rpc: JsonRpcClient,
	/// WebSocket endpoint for log subscriptions.
	ws_url: String,
	/// Deployed contract address.
	address: Address,
	/// Delay between receipt polls while a transaction is pending.
	receipt_poll_interval: Duration,
	next_watch_id: AtomicU64,
	/// Cancellation handles of running subscription tasks.
	watches: Mutex<HashMap<SubscriptionId, oneshot::Sender<()>>>,
}

impl RpcWavePortal {
	/// Create a new portal client.
	///
	/// # Errors
	/// Returns `ContractError::ChainRead` if `address` is not a valid contract address.
	pub fn new(
		rpc: JsonRpcClient,
		ws_url: impl Into<String>,
		address: &str,
		receipt_poll_interval: Duration,
	) -> Result<Self, ContractError> {
		let address = address.parse::<Address>().map_err(|e| {
			ContractError::ChainRead(format!("Invalid contract address {}: {}", address, e))
		})?;

		Ok(Self {
			rpc,
			ws_url: ws_url.into(),
			address,
			receipt_poll_interval,
			next_watch_id: AtomicU64::new(1),
			watches: Mutex::new(HashMap::new()),
		})
	}

	async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, ContractError> {
		let params = json!([
			{
				"to": self.address.to_checksum(None),
				"data": format!("0x{}", hex::encode(&data)),
			},
			"latest"
		]);

		let result = self
			.rpc
			.call("eth_call", params)
			.await
			.map_err(|e| ContractError::ChainRead(e.to_string()))?;
		let encoded = result.as_str().ok_or_else(|| {
			ContractError::ChainRead(format!("Unexpected eth_call result: {}", result))
		})?;

		decode_hex(encoded).map_err(ContractError::ChainRead)
	}

	fn log_filter(&self) -> Value {
		json!({
			"address": self.address.to_checksum(None),
			"topics": [format!("0x{}", hex::encode(abi::new_wave_topic()))],
		})
	}
}

#[async_trait::async_trait]
impl WavePortal for RpcWavePortal {
	async fn get_all_waves(&self) -> Result<Vec<RawWave>, ContractError> {
		let data = self.call(abi::encode_get_all_waves()).await?;
		abi::decode_all_waves(&data)
	}

	async fn get_total_waves(&self) -> Result<u64, ContractError> {
		let data = self.call(abi::encode_get_total_waves()).await?;
		abi::decode_total_waves(&data)
	}

	async fn wave(
		&self,
		from: &str,
		message: &str,
		gas_limit: u64,
	) -> Result<TxHandle, ContractError> {
		let params = json!([{
			"from": from,
			"to": self.address.to_checksum(None),
			"data": format!("0x{}", hex::encode(abi::encode_wave(message))),
			"gas": format!("0x{:x}", gas_limit),
		}]);

		match self.rpc.call("eth_sendTransaction", params).await {
			Ok(Value::String(hash)) => {
				info!("Mining... {}", hash);
				Ok(TxHandle { hash })
			}
			Ok(other) => Err(ContractError::ChainWrite(format!(
				"Unexpected eth_sendTransaction result: {}",
				other
			))),
			Err(e) => Err(classify_write_error(e)),
		}
	}

	async fn wait(&self, tx: &TxHandle) -> Result<TxReceipt, ContractError> {
		loop {
			let receipt = self
				.rpc
				.call("eth_getTransactionReceipt", json!([tx.hash]))
				.await
				.map_err(|e| ContractError::ChainWrite(e.to_string()))?;

			if receipt.is_null() {
				debug!("Transaction {} still pending", tx.hash);
				tokio::time::sleep(self.receipt_poll_interval).await;
				continue;
			}

			return receipt_outcome(&tx.hash, &receipt);
		}
	}

	async fn watch(&self, event: &str) -> Result<(SubscriptionId, WaveStream), ContractError> {
		if event != abi::NEW_WAVE_EVENT {
			return Err(ContractError::ChainRead(format!("Unknown event {}", event)));
		}

		debug!("Attempting WebSocket connection to: {}", self.ws_url);
		let (ws_stream, response) = connect_async(self.ws_url.as_str())
			.await
			.map_err(|e| ContractError::ChainRead(TransportError::from(e).to_string()))?;
		debug!(
			"WebSocket connection established, response status: {}",
			response.status()
		);
		let (mut ws_sender, mut ws_receiver) = ws_stream.split();

		let subscribe_message = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": "eth_subscribe",
			"params": ["logs", self.log_filter()]
		});
		ws_sender
			.send(Message::Text(subscribe_message.to_string()))
			.await
			.map_err(|e| ContractError::ChainRead(e.to_string()))?;

		// Wait for the subscription id
		let remote_id = loop {
			match ws_receiver.next().await {
				Some(Ok(Message::Text(text))) => {
					let mut parsed: Value = serde_json::from_str(&text)
						.map_err(|e| ContractError::ChainRead(e.to_string()))?;
					if parsed.get("id").and_then(Value::as_u64) != Some(1) {
						continue;
					}
					let result = crate::provider::rpc::response_from_json(&mut parsed)
						.map_err(|e| ContractError::ChainRead(e.to_string()))?;
					break result.as_str().map(str::to_string).ok_or_else(|| {
						ContractError::ChainRead(format!("Unexpected eth_subscribe result: {}", result))
					})?;
				}
				Some(Ok(_)) => continue,
				Some(Err(e)) => return Err(ContractError::ChainRead(e.to_string())),
				None => {
					return Err(ContractError::ChainRead(
						"Connection closed before subscription was acknowledged".to_string(),
					));
				}
			}
		};
		info!("Subscribed to {} logs as {}", event, remote_id);

		let (event_sender, event_receiver) = mpsc::unbounded_channel();
		let (cancel_sender, mut cancel_receiver) = oneshot::channel::<()>();

		tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = &mut cancel_receiver => {
						let unsubscribe_message = json!({
							"jsonrpc": "2.0",
							"id": 2,
							"method": "eth_unsubscribe",
							"params": [remote_id]
						});
						if let Err(e) = ws_sender.send(Message::Text(unsubscribe_message.to_string())).await {
							warn!("Failed to send eth_unsubscribe for {}: {}", remote_id, e);
						}
						if let Err(e) = ws_sender.close().await {
							debug!("Closing subscription socket failed: {}", e);
						}
						break;
					}
					message = ws_receiver.next() => match message {
						Some(Ok(Message::Text(text))) => {
							if let Some(item) = parse_log_notification(&text, &remote_id) {
								if event_sender.send(item).is_err() {
									debug!("Subscription {} receiver dropped", remote_id);
									break;
								}
							}
						}
						Some(Ok(_)) => {}
						Some(Err(e)) => {
							error!("Error in log subscription {}: {}", remote_id, e);
							let _ = event_sender.send(Err(ContractError::ChainRead(e.to_string())));
							break;
						}
						None => {
							info!("Log subscription {} closed by the node", remote_id);
							break;
						}
					}
				}
			}
		});

		let id = SubscriptionId(self.next_watch_id.fetch_add(1, Ordering::Relaxed));
		self.watches
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(id, cancel_sender);

		let stream = futures::stream::unfold(event_receiver, |mut receiver| async move {
			receiver.recv().await.map(|item| (item, receiver))
		})
		.boxed();
		Ok((id, stream))
	}

	async fn unwatch(&self, id: SubscriptionId) -> Result<(), ContractError> {
		let cancel = self
			.watches
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&id)
			.ok_or(ContractError::NotSubscribed(id))?;

		// The task may already have exited on its own
		if cancel.send(()).is_err() {
			debug!("Subscription task for {:?} already finished", id);
		}
		Ok(())
	}
}

fn decode_hex(encoded: &str) -> Result<Vec<u8>, String> {
	let digits = encoded.strip_prefix("0x").unwrap_or(encoded);
	hex::decode(digits).map_err(|e| format!("Invalid hex data: {}", e))
}

fn classify_write_error(error: TransportError) -> ContractError {
	match error {
		TransportError::Rpc { code, message } if code == USER_REJECTED_REQUEST => {
			ContractError::TransactionRejected(message)
		}
		TransportError::Rpc { message, .. } if message.to_lowercase().contains("revert") => {
			ContractError::TransactionReverted(message)
		}
		other => ContractError::ChainWrite(other.to_string()),
	}
}

fn receipt_outcome(hash: &str, receipt: &Value) -> Result<TxReceipt, ContractError> {
	let block_number = receipt
		.get("blockNumber")
		.and_then(Value::as_str)
		.and_then(|n| u64::from_str_radix(n.trim_start_matches("0x"), 16).ok());

	match receipt.get("status").and_then(Value::as_str) {
		Some("0x0") => Err(ContractError::TransactionReverted(format!(
			"Transaction {} failed in block {:?}",
			hash, block_number
		))),
		_ => Ok(TxReceipt {
			hash: hash.to_string(),
			block_number,
		}),
	}
}

/// Turn an `eth_subscription` notification for `remote_id` into a decoded wave.
///
/// Returns `None` for messages that belong to other subscriptions, replies to requests, and logs
/// removed by a reorg.
fn parse_log_notification(text: &str, remote_id: &str) -> Option<Result<RawWave, ContractError>> {
	let parsed: Value = match serde_json::from_str(text) {
		Ok(parsed) => parsed,
		Err(e) => return Some(Err(ContractError::ChainRead(e.to_string()))),
	};

	if parsed.get("method").and_then(Value::as_str) != Some("eth_subscription") {
		return None;
	}
	let params = parsed.get("params")?;
	if params.get("subscription").and_then(Value::as_str) != Some(remote_id) {
		return None;
	}
	let log = params.get("result")?;
	if log.get("removed").and_then(Value::as_bool) == Some(true) {
		debug!("Skipping removed log");
		return None;
	}

	Some(decode_log(log))
}

fn decode_log(log: &Value) -> Result<RawWave, ContractError> {
	let topics = log
		.get("topics")
		.and_then(Value::as_array)
		.ok_or_else(|| ContractError::ChainRead("Log without topics".to_string()))?
		.iter()
		.map(|topic| {
			topic
				.as_str()
				.and_then(|t| t.parse::<B256>().ok())
				.ok_or_else(|| ContractError::ChainRead(format!("Invalid topic {}", topic)))
		})
		.collect::<Result<Vec<B256>, ContractError>>()?;

	let data = log
		.get("data")
		.and_then(Value::as_str)
		.ok_or_else(|| ContractError::ChainRead("Log without data".to_string()))?;
	let data = decode_hex(data).map_err(ContractError::ChainRead)?;

	abi::decode_new_wave(topics, Bytes::from(data))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;
	use alloy_sol_types::SolEvent;

	fn notification(subscription: &str, removed: bool) -> String {
		let event = abi::NewWave {
			from: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
				.parse()
				.expect("valid address"),
			timestamp: U256::from(1_000u64),
			message: "hi".to_string(),
		};
		let log = event.encode_log_data();
		json!({
			"jsonrpc": "2.0",
			"method": "eth_subscription",
			"params": {
				"subscription": subscription,
				"result": {
					"removed": removed,
					"topics": log.topics().iter().map(|t| format!("0x{}", hex::encode(t))).collect::<Vec<_>>(),
					"data": format!("0x{}", hex::encode(&log.data)),
				}
			}
		})
		.to_string()
	}

	#[test]
	fn test_notification_for_our_subscription_is_decoded() {
		let wave = parse_log_notification(&notification("0xabc", false), "0xabc")
			.expect("notification should be recognised")
			.expect("log should decode");
		assert_eq!(wave.timestamp, 1_000);
		assert_eq!(wave.message, "hi");
	}

	#[test]
	fn test_foreign_and_removed_notifications_are_skipped() {
		assert!(parse_log_notification(&notification("0xother", false), "0xabc").is_none());
		assert!(parse_log_notification(&notification("0xabc", true), "0xabc").is_none());
		assert!(parse_log_notification(r#"{"jsonrpc":"2.0","id":2,"result":true}"#, "0xabc").is_none());
	}

	#[test]
	fn test_receipt_status() {
		let mined = json!({ "status": "0x1", "blockNumber": "0x10" });
		assert_eq!(
			receipt_outcome("0xfeed", &mined).unwrap(),
			TxReceipt {
				hash: "0xfeed".to_string(),
				block_number: Some(16),
			}
		);

		let failed = json!({ "status": "0x0", "blockNumber": "0x11" });
		assert!(matches!(
			receipt_outcome("0xfeed", &failed),
			Err(ContractError::TransactionReverted(_))
		));
	}

	#[test]
	fn test_write_errors_are_classified() {
		let rejected = classify_write_error(TransportError::Rpc {
			code: USER_REJECTED_REQUEST,
			message: "User denied transaction signature".to_string(),
		});
		assert!(matches!(rejected, ContractError::TransactionRejected(_)));

		let reverted = classify_write_error(TransportError::Rpc {
			code: 3,
			message: "execution reverted".to_string(),
		});
		assert!(matches!(reverted, ContractError::TransactionReverted(_)));

		let other = classify_write_error(TransportError::NoData);
		assert!(matches!(other, ContractError::ChainWrite(_)));
	}

	#[test]
	fn test_invalid_contract_address_is_rejected() {
		let rpc = JsonRpcClient::new("http://127.0.0.1:8545").expect("client builds");
		assert!(
			RpcWavePortal::new(rpc, "ws://127.0.0.1:8545", "not-an-address", Duration::from_secs(1))
				.is_err()
		);
	}
}
