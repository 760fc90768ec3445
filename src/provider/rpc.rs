//!
//! JSON-RPC transport and provider for talking to an Ethereum node directly.
//!
//! `JsonRpcClient` executes JSON-RPC 2.0 requests over HTTP and is shared with the contract
//! adapter. `JsonRpcProvider` implements the wallet provider capability on top of it, turning
//! periodic `eth_accounts` / `eth_chainId` polls into change notifications.

use super::types::*;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Error types for JSON-RPC transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
	#[error("JSON-RPC error {code}: {message}")]
	Rpc { code: i64, message: String },

	#[error("No result returned")]
	NoData,

	#[error("WebSocket error: {0}")]
	WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),
}

impl From<TransportError> for ProviderRpcError {
	fn from(error: TransportError) -> Self {
		match error {
			TransportError::Rpc { code, message } => ProviderRpcError::new(code, message),
			other => ProviderRpcError::new(INTERNAL_ERROR, other.to_string()),
		}
	}
}

/// JSON-RPC 2.0 client over HTTP
#[derive(Clone)]
pub struct JsonRpcClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// The node's HTTP endpoint.
	url: String,
	/// Request id counter shared by all clones.
	next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
	/// Create a new JSON-RPC client.
	///
	/// # Arguments
	/// * `url` - The HTTP endpoint of the node.
	pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
		let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

		Ok(Self {
			http_client,
			url: url.into(),
			next_id: Arc::new(AtomicU64::new(1)),
		})
	}

	/// Execute a JSON-RPC request.
	///
	/// # Returns
	/// The `result` member of the response, which may be `null`, or a `TransportError` if the
	/// request fails or the node answers with an error object.
	pub async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request_body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params
		});
		debug!("JSON-RPC request #{}: {}", id, method);

		let response = self
			.http_client
			.post(&self.url)
			.header("Content-Type", "application/json")
			.json(&request_body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(TransportError::Rpc {
				code: INTERNAL_ERROR,
				message: format!("HTTP error: {}", response.status()),
			});
		}

		let mut response_json: Value = response.json().await?;
		response_from_json(&mut response_json)
	}
}

/// Extract `result` or the error object from a JSON-RPC response body.
pub(crate) fn response_from_json(response_json: &mut Value) -> Result<Value, TransportError> {
	if let Some(error) = response_json.get("error") {
		return Err(TransportError::Rpc {
			code: error
				.get("code")
				.and_then(Value::as_i64)
				.unwrap_or(INTERNAL_ERROR),
			message: error
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("Unknown JSON-RPC error")
				.to_string(),
		});
	}

	response_json
		.get_mut("result")
		.map(Value::take)
		.ok_or(TransportError::NoData)
}

/// Wallet provider backed by a node's JSON-RPC endpoint.
///
/// The node has no notification channel for account or chain changes, so `events` polls and
/// reports differences from the previous poll.
#[derive(Clone)]
pub struct JsonRpcProvider {
	client: JsonRpcClient,
	poll_interval: Duration,
}

impl JsonRpcProvider {
	pub fn new(client: JsonRpcClient, poll_interval: Duration) -> Self {
		Self {
			client,
			poll_interval,
		}
	}
}

#[async_trait::async_trait]
impl WalletProvider for JsonRpcProvider {
	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
		self.client
			.call(method, params)
			.await
			.map_err(ProviderRpcError::from)
	}

	fn events(&self) -> BoxStream<'static, ProviderEvent> {
		let watcher = ChangeWatcher::new(self.client.clone(), self.poll_interval);

		futures::stream::unfold(watcher, |mut watcher| async move {
			loop {
				if let Some(event) = watcher.pending.pop_front() {
					return Some((event, watcher));
				}
				if watcher.polled {
					tokio::time::sleep(watcher.poll_interval).await;
				}
				watcher.poll().await;
			}
		})
		.boxed()
	}
}

/// Poll state behind `JsonRpcProvider::events`.
///
/// Each field keeps the last value actually read. A change is reported only against a known
/// previous value, so the first successful read of a field is its baseline and a failed poll
/// never counts as a change.
struct ChangeWatcher {
	client: JsonRpcClient,
	poll_interval: Duration,
	accounts: Option<Vec<String>>,
	chain_id: Option<String>,
	polled: bool,
	pending: VecDeque<ProviderEvent>,
}

impl ChangeWatcher {
	fn new(client: JsonRpcClient, poll_interval: Duration) -> Self {
		Self {
			client,
			poll_interval,
			accounts: None,
			chain_id: None,
			polled: false,
			pending: VecDeque::new(),
		}
	}

	async fn poll(&mut self) {
		let accounts = match self.client.call("eth_accounts", json!([])).await {
			Ok(value) => match serde_json::from_value::<Vec<String>>(value) {
				Ok(accounts) => Some(accounts),
				Err(e) => {
					debug!("Ignoring malformed eth_accounts result: {}", e);
					None
				}
			},
			Err(e) => {
				debug!("eth_accounts poll failed: {}", e);
				None
			}
		};

		let chain_id = match self.client.call("eth_chainId", json!([])).await {
			Ok(Value::String(chain_id)) => Some(chain_id),
			Ok(other) => {
				debug!("Ignoring malformed eth_chainId result: {}", other);
				None
			}
			Err(e) => {
				debug!("eth_chainId poll failed: {}", e);
				None
			}
		};

		self.observe(accounts, chain_id);
		self.polled = true;
	}

	/// Compare one poll's readings with the last known values and queue the differences.
	fn observe(&mut self, accounts: Option<Vec<String>>, chain_id: Option<String>) {
		if let Some(accounts) = accounts {
			if self.accounts.as_ref().is_some_and(|known| *known != accounts) {
				info!("Accounts changed: {:?}", accounts);
				self.pending
					.push_back(ProviderEvent::AccountsChanged(accounts.clone()));
			}
			self.accounts = Some(accounts);
		}

		if let Some(chain_id) = chain_id.map(|c| c.to_lowercase()) {
			if self.chain_id.as_ref().is_some_and(|known| *known != chain_id) {
				info!("Chain changed: {}", chain_id);
				self.pending
					.push_back(ProviderEvent::ChainChanged(chain_id.clone()));
			}
			self.chain_id = Some(chain_id);
		}
	}
}
