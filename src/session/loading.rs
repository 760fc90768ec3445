//! The single loading flag and its release guard.

use super::events::{EventDispatcher, SessionEvent};
use super::types::SessionError;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Loading flag shared with the guards that hold it.
#[derive(Clone, Default)]
pub struct LoadingState {
    flag: Arc<AtomicBool>,
}

impl LoadingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag and return a guard that lowers it on drop.
    ///
    /// # Errors
    /// `OperationInProgress` if the flag is already raised.
    pub fn acquire(
        &self,
        dispatcher: Arc<Mutex<EventDispatcher>>,
    ) -> Result<LoadingGuard, SessionError> {
        if self
            .flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::OperationInProgress);
        }

        notify(&dispatcher, true);
        Ok(LoadingGuard {
            flag: self.flag.clone(),
            dispatcher,
        })
    }
}

/// Holds the loading flag. Dropping it releases the flag in every path.
pub struct LoadingGuard {
    flag: Arc<AtomicBool>,
    dispatcher: Arc<Mutex<EventDispatcher>>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        notify(&self.dispatcher, false);
    }
}

fn notify(dispatcher: &Mutex<EventDispatcher>, loading: bool) {
    match dispatcher.lock() {
        Ok(mut dispatcher) => dispatcher.dispatch(&SessionEvent::LoadingChanged(loading)),
        Err(_) => tracing::error!("Event dispatcher poisoned, dropping loading={}", loading),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_flag_on_drop() {
        let dispatcher = Arc::new(Mutex::new(EventDispatcher::new()));
        let loading = LoadingState::new();

        let guard = loading.acquire(dispatcher.clone()).unwrap();
        assert!(loading.is_loading());
        assert!(matches!(
            loading.acquire(dispatcher.clone()),
            Err(SessionError::OperationInProgress)
        ));

        drop(guard);
        assert!(!loading.is_loading());
        assert!(loading.acquire(dispatcher).is_ok());
    }
}
