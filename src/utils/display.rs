use crate::waves::WaveRecord;

use chrono::{DateTime, Utc};

/// Abbreviate a hex address as `0x1234…abcd`. Short inputs are returned unchanged.
pub fn short_address(address: &str) -> String {
    if address.len() <= 12
        || !address.is_char_boundary(6)
        || !address.is_char_boundary(address.len() - 4)
    {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}

pub fn format_wave_time(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc2822()
}

/// One-line rendering of a wave for terminal output.
pub fn format_wave(wave: &WaveRecord) -> String {
    format!(
        "[{}] {}: {}",
        format_wave_time(wave.timestamp()),
        short_address(wave.address()),
        wave.message()
    )
}
