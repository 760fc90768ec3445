//! In-memory wallet and contract doubles.
//!
//! `DevWallet` answers the EIP-1193 methods the gateway uses and pushes notifications on demand.
//! `DevPortal` keeps wave history in memory, mines transactions on `wait` and feeds live
//! `NewWave` events through tokio channels. Both can write to a shared `Journal` so tests can
//! assert on the interleaving of calls and session events.

use crate::contract::{
    ContractError, NEW_WAVE_EVENT, RawWave, SubscriptionId, TxHandle, TxReceipt, WavePortal,
    WaveStream,
};
use crate::provider::{
    ProviderEvent, ProviderRpcError, UNSUPPORTED_METHOD, USER_REJECTED_REQUEST, WalletProvider,
};
use crate::session::{SessionEvent, SessionEventHandler};

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Ordered log of calls and events shared between doubles.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn write(journal: &Option<Journal>, entry: impl Into<String>) {
    if let Some(journal) = journal {
        journal.lock().unwrap().push(entry.into());
    }
}

fn receiver_stream<T: Send + 'static>(rx: mpsc::UnboundedReceiver<T>) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

#[derive(Default)]
struct WalletState {
    chain_id: String,
    accounts: Vec<String>,
    authorized: bool,
    /// Error code returned by `wallet_switchEthereumChain`, if it should fail.
    switch_error: Option<i64>,
    reject_accounts: bool,
    requests: Vec<String>,
    subscribers: Vec<mpsc::UnboundedSender<ProviderEvent>>,
}

/// Wallet provider double.
pub struct DevWallet {
    state: Mutex<WalletState>,
}

impl DevWallet {
    pub fn new(chain_id: &str) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(WalletState {
                chain_id: chain_id.to_string(),
                ..WalletState::default()
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap()
    }

    /// Accounts the wallet holds. They are exposed by `eth_accounts` only once authorized.
    pub fn set_accounts(&self, accounts: Vec<String>) {
        self.state().accounts = accounts;
    }

    /// Grant access as if the user connected earlier.
    pub fn authorize(&self) {
        self.state().authorized = true;
    }

    pub fn set_chain(&self, chain_id: &str) {
        self.state().chain_id = chain_id.to_string();
    }

    pub fn chain_id(&self) -> String {
        self.state().chain_id.clone()
    }

    pub fn reject_network_switch(&self, reject: bool) {
        self.state().switch_error = reject.then_some(USER_REJECTED_REQUEST);
    }

    /// Make `wallet_switchEthereumChain` fail with `code`, e.g. 4902 for an unknown chain.
    pub fn fail_network_switch(&self, code: i64) {
        self.state().switch_error = Some(code);
    }

    pub fn reject_account_requests(&self, reject: bool) {
        self.state().reject_accounts = reject;
    }

    /// Methods requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    /// Push a notification to every open event stream.
    pub fn emit(&self, event: ProviderEvent) {
        self.state()
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[async_trait::async_trait]
impl WalletProvider for DevWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        let mut state = self.state();
        state.requests.push(method.to_string());

        match method {
            "eth_chainId" => Ok(json!(state.chain_id)),
            "eth_accounts" => {
                let visible = if state.authorized {
                    state.accounts.clone()
                } else {
                    Vec::new()
                };
                Ok(json!(visible))
            }
            "eth_requestAccounts" => {
                if state.reject_accounts {
                    return Err(ProviderRpcError::new(
                        USER_REJECTED_REQUEST,
                        "User rejected the request.",
                    ));
                }
                state.authorized = true;
                Ok(json!(state.accounts))
            }
            "wallet_switchEthereumChain" => {
                if let Some(code) = state.switch_error {
                    return Err(ProviderRpcError::new(code, "Chain switch failed."));
                }
                let chain_id = params[0]["chainId"].as_str().unwrap_or_default().to_string();
                state.chain_id = chain_id;
                Ok(Value::Null)
            }
            other => Err(ProviderRpcError::new(
                UNSUPPORTED_METHOD,
                format!("{} is not supported", other),
            )),
        }
    }

    fn events(&self) -> BoxStream<'static, ProviderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state().subscribers.push(tx);
        receiver_stream(rx)
    }
}

struct PendingWave {
    wave: RawWave,
    reverts: bool,
}

#[derive(Default)]
struct PortalState {
    history: Vec<RawWave>,
    /// Registrations by id. A closed stream keeps its registration until `unwatch`.
    watchers: HashMap<u64, Option<mpsc::UnboundedSender<Result<RawWave, ContractError>>>>,
    next_watch_id: u64,
    unwatch_count: usize,
    pending: HashMap<String, PendingWave>,
    fail_fetches: bool,
    fetch_count: usize,
    reject_next: bool,
    revert_next: bool,
    last_gas_limit: Option<u64>,
    journal: Option<Journal>,
}

/// Wave portal double.
pub struct DevPortal {
    state: Mutex<PortalState>,
}

impl DevPortal {
    pub fn new() -> Arc<Self> {
        Self::with_waves(Vec::new())
    }

    pub fn with_waves(history: Vec<RawWave>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PortalState {
                history,
                ..PortalState::default()
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap()
    }

    /// Record contract calls into `journal`.
    pub fn attach_journal(&self, journal: Journal) {
        self.state().journal = Some(journal);
    }

    /// Push a live item to every open watcher.
    pub fn emit(&self, item: Result<RawWave, ContractError>) {
        for tx in self.state().watchers.values().flatten() {
            let _ = tx.send(item.clone());
        }
    }

    pub fn emit_new_wave(&self, wave: RawWave) {
        self.emit(Ok(wave));
    }

    /// End every live stream, as a dropped connection would. Registrations stay until released.
    pub fn close_watchers(&self) {
        for tx in self.state().watchers.values_mut() {
            tx.take();
        }
    }

    /// Registrations not yet released with `unwatch`.
    pub fn watcher_count(&self) -> usize {
        self.state().watchers.len()
    }

    pub fn unwatch_count(&self) -> usize {
        self.state().unwatch_count
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.state().fail_fetches = fail;
    }

    pub fn fetch_count(&self) -> usize {
        self.state().fetch_count
    }

    pub fn reject_next_wave(&self) {
        self.state().reject_next = true;
    }

    pub fn revert_next_wave(&self) {
        self.state().revert_next = true;
    }

    pub fn waves(&self) -> Vec<RawWave> {
        self.state().history.clone()
    }

    pub fn last_gas_limit(&self) -> Option<u64> {
        self.state().last_gas_limit
    }
}

#[async_trait::async_trait]
impl WavePortal for DevPortal {
    async fn get_all_waves(&self) -> Result<Vec<RawWave>, ContractError> {
        let mut state = self.state();
        write(&state.journal, "fetch");
        state.fetch_count += 1;
        if state.fail_fetches {
            return Err(ContractError::ChainRead("node unavailable".to_string()));
        }
        Ok(state.history.clone())
    }

    async fn get_total_waves(&self) -> Result<u64, ContractError> {
        let state = self.state();
        write(&state.journal, "total");
        Ok(state.history.len() as u64)
    }

    async fn wave(
        &self,
        from: &str,
        message: &str,
        gas_limit: u64,
    ) -> Result<TxHandle, ContractError> {
        let mut state = self.state();
        write(&state.journal, "wave");
        state.last_gas_limit = Some(gas_limit);
        if std::mem::take(&mut state.reject_next) {
            return Err(ContractError::TransactionRejected("user denied signature".to_string()));
        }

        let hash = format!("0x{}", hex::encode(rand::random::<[u8; 32]>()));
        let reverts = std::mem::take(&mut state.revert_next);
        let wave = RawWave {
            waver: from.to_string(),
            timestamp: chrono::Utc::now().timestamp().unsigned_abs(),
            message: message.to_string(),
        };
        state
            .pending
            .insert(hash.clone(), PendingWave { wave, reverts });
        Ok(TxHandle { hash })
    }

    async fn wait(&self, tx: &TxHandle) -> Result<TxReceipt, ContractError> {
        let mut state = self.state();
        write(&state.journal, "wait");
        let pending = state
            .pending
            .remove(&tx.hash)
            .ok_or_else(|| ContractError::ChainWrite(format!("unknown transaction {}", tx.hash)))?;
        if pending.reverts {
            return Err(ContractError::TransactionReverted(tx.hash.clone()));
        }

        state.history.push(pending.wave.clone());
        let block_number = state.history.len() as u64;
        for watcher in state.watchers.values().flatten() {
            let _ = watcher.send(Ok(pending.wave.clone()));
        }
        Ok(TxReceipt {
            hash: tx.hash.clone(),
            block_number: Some(block_number),
        })
    }

    async fn watch(&self, event: &str) -> Result<(SubscriptionId, WaveStream), ContractError> {
        if event != NEW_WAVE_EVENT {
            return Err(ContractError::ChainRead(format!("unknown event {}", event)));
        }
        let mut state = self.state();
        state.next_watch_id += 1;
        let id = state.next_watch_id;
        let (tx, rx) = mpsc::unbounded_channel();
        state.watchers.insert(id, Some(tx));
        Ok((SubscriptionId(id), receiver_stream(rx)))
    }

    async fn unwatch(&self, id: SubscriptionId) -> Result<(), ContractError> {
        let mut state = self.state();
        state
            .watchers
            .remove(&id.0)
            .ok_or(ContractError::NotSubscribed(id))?;
        state.unwatch_count += 1;
        Ok(())
    }
}

/// Session handler that records events and mirrors them into a journal.
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<SessionEvent>>>,
    journal: Option<Journal>,
}

impl RecordingHandler {
    pub fn new() -> (Self, Arc<Mutex<Vec<SessionEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let handler = Self {
            events: events.clone(),
            journal: None,
        };
        (handler, events)
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }
}

impl SessionEventHandler for RecordingHandler {
    fn handle(&mut self, event: &SessionEvent) {
        let entry = match event {
            SessionEvent::LoadingChanged(loading) => format!("loading:{}", loading),
            SessionEvent::SessionChanged(_) => "session".to_string(),
            SessionEvent::LedgerChanged { len, .. } => format!("ledger:{}", len),
            SessionEvent::SyncStateChanged(state) => format!("sync:{}", state),
            SessionEvent::Alert(_) => "alert".to_string(),
            SessionEvent::DraftCleared => "draft-cleared".to_string(),
        };
        write(&self.journal, entry);
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
