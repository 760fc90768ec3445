//! Observer channel of the session controller.
//!
//! Every change to the session, the loading flag, the ledger or the sync state is reported as a
//! `SessionEvent` to the handlers registered on the controller. Handlers run synchronously in
//! registration order.

use super::types::{Session, UserNotice};
use crate::contract::Epoch;
use crate::waves::SyncState;

/// Changes reported by the session controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The loading flag flipped
    LoadingChanged(bool),
    /// Account or chain changed
    SessionChanged(Session),
    /// The ledger was replaced or grew
    LedgerChanged { epoch: Epoch, len: usize },
    /// The sync engine moved to a new state
    SyncStateChanged(SyncState),
    /// An operation failed and the user should be told
    Alert(UserNotice),
    /// A wave was mined and the input draft was cleared
    DraftCleared,
}

/// Trait for observing session events.
pub trait SessionEventHandler: Send {
    fn handle(&mut self, event: &SessionEvent);

    /// Get the name of this handler for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Fans session events out to the registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Box<dyn SessionEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new event handler.
    ///
    /// Handlers are called in the order they are registered.
    pub fn register_handler(&mut self, handler: Box<dyn SessionEventHandler>) {
        tracing::debug!("Registering session handler {}", handler.name());
        self.handlers.push(handler);
    }

    pub fn dispatch(&mut self, event: &SessionEvent) {
        for handler in &mut self.handlers {
            handler.handle(event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Handler that writes every session event to the log.
pub struct TracingHandler;

impl SessionEventHandler for TracingHandler {
    fn handle(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::LoadingChanged(loading) => tracing::debug!("Loading: {}", loading),
            SessionEvent::SessionChanged(session) => tracing::info!(
                "Session: account {:?} on chain {:?}",
                session.account(),
                session.chain_id()
            ),
            SessionEvent::LedgerChanged { epoch, len } => {
                tracing::info!("Ledger at epoch {} holds {} waves", epoch, len)
            }
            SessionEvent::SyncStateChanged(state) => tracing::info!("Sync state: {}", state),
            SessionEvent::Alert(notice) => tracing::warn!("Alert: {}", notice.message),
            SessionEvent::DraftCleared => tracing::debug!("Draft cleared"),
        }
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Collect(Arc<Mutex<Vec<SessionEvent>>>, &'static str);

    impl SessionEventHandler for Collect {
        fn handle(&mut self, event: &SessionEvent) {
            self.0.lock().unwrap().push(event.clone());
        }

        fn name(&self) -> &'static str {
            self.1
        }
    }

    #[test]
    fn test_all_handlers_see_every_event() {
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register_handler(Box::new(Collect(first.clone(), "first")));
        dispatcher.register_handler(Box::new(TracingHandler));
        dispatcher.register_handler(Box::new(Collect(second.clone(), "second")));
        assert_eq!(dispatcher.handler_count(), 3);

        dispatcher.dispatch(&SessionEvent::LoadingChanged(true));
        dispatcher.dispatch(&SessionEvent::DraftCleared);

        let expected = vec![SessionEvent::LoadingChanged(true), SessionEvent::DraftCleared];
        assert_eq!(*first.lock().unwrap(), expected);
        assert_eq!(*second.lock().unwrap(), expected);
    }
}
