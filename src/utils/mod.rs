//!
//! Utility module for the wave client.
//!
//! Re-exports display helpers used by the binary and log output.
/// Formatting of addresses and wave timestamps
pub mod display;

pub use display::{format_wave, format_wave_time, short_address};
