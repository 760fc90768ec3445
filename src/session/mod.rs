//! Session orchestration and the presentation boundary.
//!
//! `SessionController` is the only writer of the wallet session and the loading flag. It drives
//! the provider gateway, rebinds the contract client with a fresh epoch on every account or
//! network change, and reports every change to registered `SessionEventHandler`s.

pub mod controller;
pub mod events;
pub mod loading;
pub mod types;

pub use controller::SessionController;
pub use events::{EventDispatcher, SessionEvent, SessionEventHandler, TracingHandler};
pub use loading::{LoadingGuard, LoadingState};
pub use types::*;
