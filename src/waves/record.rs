use crate::contract::RawWave;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A raw timestamp that cannot be represented as a point in time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Timestamp {0} is out of range")]
pub struct InvalidTimestamp(pub u64);

/// One wave, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WaveRecord {
    address: String,
    timestamp: DateTime<Utc>,
    message: String,
}

/// Identity of a wave for de-duplication: two records with the same key are the same wave.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WaveKey {
    address: String,
    timestamp_ms: i64,
    message: String,
}

impl WaveRecord {
    /// Build a record from an on-chain tuple. Seconds are scaled to milliseconds.
    pub fn from_raw(raw: RawWave) -> Result<Self, InvalidTimestamp> {
        let timestamp = i64::try_from(raw.timestamp)
            .ok()
            .and_then(|seconds| seconds.checked_mul(1000))
            .and_then(DateTime::from_timestamp_millis)
            .ok_or(InvalidTimestamp(raw.timestamp))?;

        Ok(Self {
            address: raw.waver,
            timestamp,
            message: raw.message,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn key(&self) -> WaveKey {
        WaveKey {
            address: self.address.clone(),
            timestamp_ms: self.timestamp.timestamp_millis(),
            message: self.message.clone(),
        }
    }
}

impl TryFrom<RawWave> for WaveRecord {
    type Error = InvalidTimestamp;

    fn try_from(raw: RawWave) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_scaled_to_milliseconds() {
        let record = WaveRecord::from_raw(RawWave {
            waver: "0xDEF".to_string(),
            timestamp: 1000,
            message: "hi".to_string(),
        })
        .unwrap();
        assert_eq!(record.timestamp().timestamp_millis(), 1_000_000);
        assert_eq!(record.address(), "0xDEF");
        assert_eq!(record.message(), "hi");
    }

    #[test]
    fn test_out_of_range_timestamp_is_rejected() {
        let err = WaveRecord::from_raw(RawWave {
            waver: "0xDEF".to_string(),
            timestamp: u64::MAX,
            message: "hi".to_string(),
        })
        .unwrap_err();
        assert_eq!(err, InvalidTimestamp(u64::MAX));
    }

    #[test]
    fn test_key_ignores_nothing_but_identity() {
        let raw = RawWave {
            waver: "0xDEF".to_string(),
            timestamp: 7,
            message: "hi".to_string(),
        };
        let a = WaveRecord::from_raw(raw.clone()).unwrap();
        let b = WaveRecord::from_raw(raw.clone()).unwrap();
        let c = WaveRecord::from_raw(RawWave {
            message: "hey".to_string(),
            ..raw
        })
        .unwrap();
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }
}
