//! Session controller.
//!
//! The controller is the single writer of the wallet session and the loading flag. Every
//! operation takes `&mut self`, so only one runs at a time; the loading flag is additionally
//! acquired with compare-and-set so overlapping callers sharing a controller behind a lock are
//! rejected instead of queued.
//!
//! Each successful account resolution binds a fresh `ContractClient` with the next epoch and
//! restarts the sync engine on it. Provider notifications (`accountsChanged`, `chainChanged`) run
//! the same silent resolution as a page load.

use super::events::{EventDispatcher, SessionEvent, SessionEventHandler};
use super::loading::LoadingState;
use super::types::{Session, SessionError, UserNotice};
use crate::config::ClientConfig;
use crate::contract::{ContractClient, Epoch, Signer, WavePortal};
use crate::provider::{ProviderError, ProviderEvent, ProviderGateway};
use crate::waves::{EventSyncEngine, SyncState, WaveLedger};

use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// How the account is obtained when establishing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccountSource {
	/// Prompt the user (`eth_requestAccounts`)
	Prompt,
	/// Use an already authorized account only (`eth_accounts`)
	Authorized,
}

/// Owns the session, the loading flag, the contract binding and the sync engine.
pub struct SessionController {
	config: ClientConfig,
	gateway: ProviderGateway,
	portal: Arc<dyn WavePortal>,

	session: Session,
	loading: LoadingState,
	dispatcher: Arc<Mutex<EventDispatcher>>,
	draft: String,

	/// Last epoch handed out
	epoch: Epoch,
	client: Option<ContractClient>,
	engine: EventSyncEngine,
	provider_events: Option<BoxStream<'static, ProviderEvent>>,
}

impl SessionController {
	pub fn new(config: ClientConfig, gateway: ProviderGateway, portal: Arc<dyn WavePortal>) -> Self {
		Self {
			config,
			gateway,
			portal,
			session: Session::default(),
			loading: LoadingState::new(),
			dispatcher: Arc::new(Mutex::new(EventDispatcher::new())),
			draft: String::new(),
			epoch: Epoch::default(),
			client: None,
			engine: EventSyncEngine::new(),
			provider_events: None,
		}
	}

	/// Register a presentation observer.
	pub fn register_handler(&mut self, handler: Box<dyn SessionEventHandler>) {
		match self.dispatcher.lock() {
			Ok(mut dispatcher) => dispatcher.register_handler(handler),
			Err(_) => error!("Event dispatcher poisoned, handler {} dropped", handler.name()),
		}
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	/// Merged waves, newest first.
	pub fn waves(&self) -> &WaveLedger {
		self.engine.ledger()
	}

	pub fn is_loading(&self) -> bool {
		self.loading.is_loading()
	}

	pub fn sync_state(&self) -> SyncState {
		self.engine.state()
	}

	pub fn epoch(&self) -> Epoch {
		self.epoch
	}

	pub fn draft(&self) -> &str {
		&self.draft
	}

	pub fn set_draft(&mut self, draft: impl Into<String>) {
		self.draft = draft.into();
	}

	/// Explicit connect: prompt the wallet for an account and bind to it.
	pub async fn connect(&mut self) -> Result<(), SessionError> {
		info!("Connecting wallet");
		let result = self.establish(AccountSource::Prompt).await;
		self.report(result)
	}

	/// Page-load resolution: bind to an already authorized account, never prompt.
	pub async fn initialize_on_load(&mut self) -> Result<(), SessionError> {
		info!("Checking for an authorized wallet");
		let result = self.establish(AccountSource::Authorized).await;
		self.report(result)
	}

	/// Send a wave and wait until it is mined. The draft is cleared only after confirmation.
	pub async fn submit_wave(&mut self, message: &str) -> Result<(), SessionError> {
		let result = self.send_wave(message).await;
		self.report(result)
	}

	/// Apply a provider notification by re-running the page-load resolution.
	pub async fn handle_provider_event(&mut self, event: ProviderEvent) -> Result<(), SessionError> {
		match &event {
			ProviderEvent::AccountsChanged(accounts) => {
				info!("Accounts changed: {:?}", accounts)
			}
			ProviderEvent::ChainChanged(chain_id) => info!("Chain changed to {}", chain_id),
		}
		let result = self.establish(AccountSource::Authorized).await;
		self.report(result)
	}

	/// Wait for the next live wave or provider notification and apply it.
	///
	/// An ended live stream leaves the engine `Stalled` and is reported once. Returns `false` once
	/// neither source can produce anything more.
	pub async fn process_next(&mut self) -> bool {
		enum Step {
			Delivery(crate::waves::LiveDelivery),
			SourceLost,
			Provider(ProviderEvent),
		}

		let subscribed = self.engine.is_subscribed();
		let engine = &mut self.engine;
		let events = &mut self.provider_events;
		let step = tokio::select! {
			delivery = engine.next_delivery(), if subscribed => match delivery {
				Some(delivery) => Step::Delivery(delivery),
				None => Step::SourceLost,
			},
			Some(event) = next_notification(events) => Step::Provider(event),
			else => return false,
		};

		match step {
			Step::Delivery(delivery) => {
				if self.engine.apply_live(delivery) {
					self.publish_ledger();
				}
			}
			Step::SourceLost => {
				warn!("Live wave updates stopped at {}", self.engine.epoch());
				self.dispatch(&SessionEvent::SyncStateChanged(self.engine.state()));
				self.dispatch(&SessionEvent::Alert(UserNotice::new(
					"Live wave updates stopped. Reconnect to resume.",
				)));
			}
			Step::Provider(event) => {
				// Failures are already reported as alerts.
				let _ = self.handle_provider_event(event).await;
			}
		}
		true
	}

	/// Release the live subscription and stop following provider notifications.
	pub async fn shutdown(&mut self) {
		if let Some(client) = self.client.as_mut() {
			self.engine.shutdown(client).await;
			self.dispatch(&SessionEvent::SyncStateChanged(self.engine.state()));
		}
		self.provider_events = None;
		info!("Session controller shut down");
	}

	async fn establish(&mut self, source: AccountSource) -> Result<(), SessionError> {
		let _loading = self.loading.acquire(self.dispatcher.clone())?;

		self.gateway.detect()?;
		if self.provider_events.is_none() {
			self.provider_events = Some(self.gateway.events()?.fuse().boxed());
		}

		let chain_id = match self.gateway.ensure_network(&self.config.chain_id).await {
			Ok(chain_id) => chain_id,
			Err(ProviderError::NetworkSwitchRejected { required, current }) => {
				self.update_session(None, Some(current.clone()));
				self.unbind(SyncState::Failed).await;
				return Err(ProviderError::NetworkSwitchRejected { required, current }.into());
			}
			Err(ProviderError::NetworkSwitchFailed {
				required,
				current,
				error,
			}) => {
				self.update_session(None, Some(current.clone()));
				self.unbind(SyncState::Failed).await;
				return Err(ProviderError::NetworkSwitchFailed {
					required,
					current,
					error,
				}
				.into());
			}
			Err(e) => return Err(e.into()),
		};
		let account = match source {
			AccountSource::Prompt => Some(self.gateway.request_account().await?),
			AccountSource::Authorized => self.gateway.get_authorized_account().await?,
		};

		match account {
			Some(account) => {
				self.update_session(Some(account.clone()), Some(chain_id));
				self.rebind(account).await
			}
			None => {
				// A session that was never populated stays untouched.
				if self.session != Session::default() {
					self.update_session(None, Some(chain_id));
				}
				self.unbind(SyncState::Idle).await;
				Ok(())
			}
		}
	}

	async fn rebind(&mut self, account: String) -> Result<(), SessionError> {
		self.epoch = self.epoch.next();
		let mut client = ContractClient::bind(self.portal.clone(), Signer::new(account), self.epoch);

		let result = self.engine.restart(&mut client).await;
		self.client = Some(client);
		self.dispatch(&SessionEvent::SyncStateChanged(self.engine.state()));
		result?;

		self.publish_ledger();
		Ok(())
	}

	/// Drop the binding. The last ledger stays visible.
	async fn unbind(&mut self, state: SyncState) {
		if let Some(mut client) = self.client.take() {
			info!("Releasing binding {}", client.epoch());
			self.engine.shutdown(&mut client).await;
		}
		if state == SyncState::Failed {
			self.engine.mark_failed();
		}
		self.dispatch(&SessionEvent::SyncStateChanged(self.engine.state()));
	}

	async fn send_wave(&mut self, message: &str) -> Result<(), SessionError> {
		if !self.session.is_connected() {
			return Err(SessionError::NotConnected);
		}
		let client = self.client.as_ref().ok_or(SessionError::NotConnected)?;
		let _loading = self.loading.acquire(self.dispatcher.clone())?;

		let count = client.total_waves().await?;
		info!("Retrieved total wave count... {}", count);

		let tx = client.submit_wave(message, self.config.gas_limit).await?;
		info!("Mining... {}", tx.hash);
		client.confirm(&tx).await?;
		info!("Mined -- {}", tx.hash);

		self.draft.clear();
		self.dispatch(&SessionEvent::DraftCleared);

		match client.total_waves().await {
			Ok(count) => info!("Retrieved total wave count... {}", count),
			Err(e) => warn!("Could not read wave count after mining: {}", e),
		}
		Ok(())
	}

	fn update_session(&mut self, account: Option<String>, chain_id: Option<String>) {
		let mut next = self.session.clone();
		next.set_account(account);
		next.set_chain_id(chain_id);
		if next != self.session {
			self.session = next;
			self.dispatch(&SessionEvent::SessionChanged(self.session.clone()));
		}
	}

	fn publish_ledger(&self) {
		self.dispatch(&SessionEvent::LedgerChanged {
			epoch: self.engine.epoch(),
			len: self.engine.ledger().len(),
		});
	}

	fn report<T>(&self, result: Result<T, SessionError>) -> Result<T, SessionError> {
		if let Err(e) = &result {
			error!("{}", e);
			self.dispatch(&SessionEvent::Alert(e.notice()));
		}
		result
	}

	fn dispatch(&self, event: &SessionEvent) {
		match self.dispatcher.lock() {
			Ok(mut dispatcher) => dispatcher.dispatch(event),
			Err(_) => error!("Event dispatcher poisoned, dropping {:?}", event),
		}
	}
}

async fn next_notification(
	events: &mut Option<BoxStream<'static, ProviderEvent>>,
) -> Option<ProviderEvent> {
	match events {
		Some(stream) => stream.next().await,
		None => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::contract::RawWave;
	use crate::provider::SharedProvider;
	use crate::testing::{DevPortal, DevWallet, RecordingHandler, journal};
	use crate::waves::WaveRecord;

	const SEPOLIA: &str = "0xaa36a7";
	const ALICE: &str = "0xABC";

	fn raw(waver: &str, timestamp: u64, message: &str) -> RawWave {
		RawWave {
			waver: waver.to_string(),
			timestamp,
			message: message.to_string(),
		}
	}

	fn config() -> ClientConfig {
		ClientConfig {
			contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
			..ClientConfig::default()
		}
	}

	fn controller(
		wallet: &Arc<DevWallet>,
		portal: &Arc<DevPortal>,
	) -> (SessionController, Arc<Mutex<Vec<SessionEvent>>>) {
		let provider: SharedProvider = wallet.clone();
		let gateway = ProviderGateway::new(Some(provider));
		let mut controller = SessionController::new(config(), gateway, portal.clone());
		let (handler, events) = RecordingHandler::new();
		controller.register_handler(Box::new(handler));
		(controller, events)
	}

	fn alerts(events: &Arc<Mutex<Vec<SessionEvent>>>) -> usize {
		events
			.lock()
			.unwrap()
			.iter()
			.filter(|e| matches!(e, SessionEvent::Alert(_)))
			.count()
	}

	#[tokio::test]
	async fn test_initialize_without_authorized_account_does_nothing() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::with_waves(vec![raw("0xDEF", 1000, "hi")]);
		let (mut controller, _) = controller(&wallet, &portal);

		controller.initialize_on_load().await.unwrap();
		assert_eq!(controller.session().account(), None);
		assert!(controller.waves().is_empty());
		assert_eq!(portal.fetch_count(), 0);
		assert!(!controller.is_loading());
		assert_eq!(controller.sync_state(), SyncState::Idle);
	}

	#[tokio::test]
	async fn test_initialize_without_account_leaves_session_empty() {
		let wallet = DevWallet::new(SEPOLIA);
		let portal = DevPortal::new();
		let (mut controller, events) = controller(&wallet, &portal);

		controller.initialize_on_load().await.unwrap();
		assert_eq!(*controller.session(), Session::default());
		assert_eq!(controller.session().chain_id(), None);
		assert!(!events
			.lock()
			.unwrap()
			.iter()
			.any(|e| matches!(e, SessionEvent::SessionChanged(_))));
	}

	#[tokio::test]
	async fn test_initialize_binds_authorized_account() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		wallet.authorize();
		let portal = DevPortal::with_waves(vec![raw("0xDEF", 1000, "hi")]);
		let (mut controller, _) = controller(&wallet, &portal);

		controller.initialize_on_load().await.unwrap();
		assert_eq!(controller.session().account(), Some(ALICE));
		assert_eq!(controller.session().chain_id(), Some(SEPOLIA));
		assert_eq!(controller.waves().len(), 1);
		assert_eq!(controller.sync_state(), SyncState::Live);
		assert!(!wallet.requests().iter().any(|m| m == "eth_requestAccounts"));
	}

	#[tokio::test]
	async fn test_connect_loads_snapshot() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::with_waves(vec![raw("0xDEF", 1000, "hi")]);
		let (mut controller, events) = controller(&wallet, &portal);

		controller.connect().await.unwrap();
		assert_eq!(controller.session().account(), Some(ALICE));
		assert_eq!(controller.epoch(), Epoch::new(1));

		let waves: Vec<&WaveRecord> = controller.waves().iter().collect();
		assert_eq!(waves.len(), 1);
		assert_eq!(waves[0].address(), "0xDEF");
		assert_eq!(waves[0].timestamp().timestamp_millis(), 1_000_000);
		assert_eq!(waves[0].message(), "hi");

		let events = events.lock().unwrap();
		assert_eq!(events.first(), Some(&SessionEvent::LoadingChanged(true)));
		assert_eq!(events.last(), Some(&SessionEvent::LoadingChanged(false)));
		assert!(events.contains(&SessionEvent::LedgerChanged {
			epoch: Epoch::new(1),
			len: 1,
		}));
	}

	#[tokio::test]
	async fn test_duplicate_live_push_keeps_one_entry() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::with_waves(vec![raw("0xDEF", 1000, "hi")]);
		let (mut controller, _) = controller(&wallet, &portal);
		controller.connect().await.unwrap();

		portal.emit_new_wave(raw("0xDEF", 1000, "hi"));
		assert!(controller.process_next().await);
		assert_eq!(controller.waves().len(), 1);

		portal.emit_new_wave(raw("0x123", 2000, "later"));
		assert!(controller.process_next().await);
		assert_eq!(controller.waves().len(), 2);
		assert_eq!(controller.waves().records()[0].message(), "later");
	}

	#[tokio::test]
	async fn test_submit_wave_clears_draft_after_confirmation() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::new();
		let (mut controller, _) = controller(&wallet, &portal);
		controller.connect().await.unwrap();

		let log = journal();
		portal.attach_journal(log.clone());
		let (handler, _) = RecordingHandler::new();
		controller.register_handler(Box::new(handler.with_journal(log.clone())));

		controller.set_draft("yo");
		controller.submit_wave("yo").await.unwrap();
		assert_eq!(controller.draft(), "");
		assert!(!controller.is_loading());
		assert_eq!(
			*log.lock().unwrap(),
			vec![
				"loading:true",
				"total",
				"wave",
				"wait",
				"draft-cleared",
				"total",
				"loading:false",
			]
		);
		assert_eq!(portal.last_gas_limit(), Some(300_000));

		// The mined wave arrives through the live subscription.
		assert!(controller.process_next().await);
		assert_eq!(controller.waves().len(), 1);
		assert_eq!(controller.waves().records()[0].address(), ALICE);
	}

	#[tokio::test]
	async fn test_rejected_wave_keeps_draft() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::new();
		let (mut controller, events) = controller(&wallet, &portal);
		controller.connect().await.unwrap();

		controller.set_draft("yo");
		portal.reject_next_wave();
		let err = controller.submit_wave("yo").await.unwrap_err();
		assert!(matches!(
			err,
			SessionError::Contract(crate::contract::ContractError::TransactionRejected(_))
		));
		assert_eq!(controller.draft(), "yo");
		assert!(!controller.is_loading());
		assert_eq!(alerts(&events), 1);

		portal.revert_next_wave();
		assert!(controller.submit_wave("yo").await.is_err());
		assert_eq!(controller.draft(), "yo");
	}

	#[tokio::test]
	async fn test_submit_without_account_is_rejected() {
		let wallet = DevWallet::new(SEPOLIA);
		let portal = DevPortal::new();
		let (mut controller, events) = controller(&wallet, &portal);

		let err = controller.submit_wave("yo").await.unwrap_err();
		assert_eq!(err, SessionError::NotConnected);
		assert_eq!(alerts(&events), 1);
		assert!(portal.last_gas_limit().is_none());
	}

	#[tokio::test]
	async fn test_network_switch_rejection_alerts_and_leaves_no_account() {
		let wallet = DevWallet::new("0x1");
		wallet.set_accounts(vec![ALICE.to_string()]);
		wallet.reject_network_switch(true);
		let portal = DevPortal::new();
		let (mut controller, events) = controller(&wallet, &portal);

		let err = controller.connect().await.unwrap_err();
		assert!(matches!(
			err,
			SessionError::Provider(ProviderError::NetworkSwitchRejected { .. })
		));
		assert_eq!(controller.session().account(), None);
		assert_eq!(controller.session().chain_id(), Some("0x1"));
		assert_eq!(controller.sync_state(), SyncState::Failed);
		assert!(!controller.is_loading());
		assert_eq!(alerts(&events), 1);
		assert!(!wallet.requests().iter().any(|m| m == "eth_requestAccounts"));

		// A manual switch in the wallet rebinds.
		wallet.reject_network_switch(false);
		wallet.set_chain(SEPOLIA);
		wallet.authorize();
		wallet.emit(ProviderEvent::ChainChanged(SEPOLIA.to_string()));
		assert!(controller.process_next().await);
		assert_eq!(controller.session().account(), Some(ALICE));
		assert_eq!(controller.sync_state(), SyncState::Live);
	}

	#[tokio::test]
	async fn test_failed_network_switch_releases_binding() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::with_waves(vec![raw("0xDEF", 1000, "hi")]);
		let (mut controller, events) = controller(&wallet, &portal);
		controller.connect().await.unwrap();
		assert_eq!(portal.watcher_count(), 1);

		wallet.set_chain("0x89");
		wallet.fail_network_switch(4902);
		let err = controller
			.handle_provider_event(ProviderEvent::ChainChanged("0x89".to_string()))
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			SessionError::Provider(ProviderError::NetworkSwitchFailed { .. })
		));
		assert_eq!(controller.session().account(), None);
		assert_eq!(controller.session().chain_id(), Some("0x89"));
		assert_eq!(controller.sync_state(), SyncState::Failed);
		assert_eq!(portal.watcher_count(), 0);
		assert_eq!(controller.waves().len(), 1);
		assert_eq!(alerts(&events), 1);

		// No transaction can be sent against the old binding.
		let err = controller.submit_wave("yo").await.unwrap_err();
		assert_eq!(err, SessionError::NotConnected);
		assert!(portal.last_gas_limit().is_none());
	}

	#[tokio::test]
	async fn test_ended_live_stream_stalls_and_alerts() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::new();
		let (mut controller, events) = controller(&wallet, &portal);
		controller.connect().await.unwrap();

		portal.close_watchers();
		assert!(controller.process_next().await);
		assert_eq!(controller.sync_state(), SyncState::Stalled);
		assert_eq!(alerts(&events), 1);
		assert!(events
			.lock()
			.unwrap()
			.contains(&SessionEvent::SyncStateChanged(SyncState::Stalled)));
		assert_eq!(portal.watcher_count(), 1);

		controller.shutdown().await;
		assert_eq!(portal.watcher_count(), 0);
		assert_eq!(controller.sync_state(), SyncState::Idle);
	}

	#[tokio::test]
	async fn test_no_provider_alerts() {
		let portal = DevPortal::new();
		let mut controller =
			SessionController::new(config(), ProviderGateway::new(None), portal.clone());
		let (handler, events) = RecordingHandler::new();
		controller.register_handler(Box::new(handler));

		let err = controller.connect().await.unwrap_err();
		assert_eq!(err, SessionError::Provider(ProviderError::NoProviderFound));
		assert_eq!(alerts(&events), 1);
		assert!(!controller.is_loading());
		assert!(!controller.process_next().await);
	}

	#[tokio::test]
	async fn test_revoked_accounts_tear_down_subscription() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::with_waves(vec![raw("0xDEF", 1000, "hi")]);
		let (mut controller, _) = controller(&wallet, &portal);
		controller.connect().await.unwrap();
		assert_eq!(portal.watcher_count(), 1);

		wallet.set_accounts(Vec::new());
		wallet.emit(ProviderEvent::AccountsChanged(Vec::new()));
		assert!(controller.process_next().await);

		assert_eq!(controller.session().account(), None);
		assert_eq!(portal.watcher_count(), 0);
		assert_eq!(controller.sync_state(), SyncState::Idle);
		assert_eq!(controller.waves().len(), 1);
	}

	#[tokio::test]
	async fn test_account_change_rebinds_with_new_epoch() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::with_waves(vec![raw("0xDEF", 1000, "hi")]);
		let (mut controller, _) = controller(&wallet, &portal);
		controller.connect().await.unwrap();

		wallet.set_accounts(vec!["0xBEEF".to_string()]);
		controller
			.handle_provider_event(ProviderEvent::AccountsChanged(vec!["0xBEEF".to_string()]))
			.await
			.unwrap();

		assert_eq!(controller.session().account(), Some("0xBEEF"));
		assert_eq!(controller.epoch(), Epoch::new(2));
		assert_eq!(portal.watcher_count(), 1);
		assert_eq!(portal.fetch_count(), 2);
	}

	#[tokio::test]
	async fn test_failed_refetch_keeps_ledger_and_alerts() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::with_waves(vec![raw("0xDEF", 1000, "hi")]);
		let (mut controller, events) = controller(&wallet, &portal);
		controller.connect().await.unwrap();

		portal.fail_fetches(true);
		let err = controller
			.handle_provider_event(ProviderEvent::ChainChanged(SEPOLIA.to_string()))
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			SessionError::Contract(crate::contract::ContractError::ChainRead(_))
		));
		assert_eq!(controller.waves().len(), 1);
		assert_eq!(controller.sync_state(), SyncState::Failed);
		assert_eq!(alerts(&events), 1);
	}

	#[tokio::test]
	async fn test_shutdown_releases_subscription() {
		let wallet = DevWallet::new(SEPOLIA);
		wallet.set_accounts(vec![ALICE.to_string()]);
		let portal = DevPortal::new();
		let (mut controller, _) = controller(&wallet, &portal);
		controller.connect().await.unwrap();

		controller.shutdown().await;
		assert_eq!(portal.watcher_count(), 0);
		assert_eq!(controller.sync_state(), SyncState::Idle);
		assert!(!controller.process_next().await);
	}
}
