//! Solidity interface of the wave portal contract.
//!
//! Encoding and decoding go through `alloy-sol-types`; the helpers here turn ABI values into the
//! crate's `RawWave` tuples and classify failures as chain read errors.

use super::types::{ContractError, RawWave};
use alloy_primitives::{B256, Bytes, LogData, U256};
use alloy_sol_types::{SolCall, SolEvent, sol};

sol! {
    #[derive(Debug)]
    struct Wave {
        address waver;
        string message;
        uint256 timestamp;
    }

    #[derive(Debug)]
    event NewWave(address indexed from, uint256 timestamp, string message);

    function wave(string _message) external;
    function getAllWaves() external view returns (Wave[] memory);
    function getTotalWaves() external view returns (uint256);
}

/// Name of the live event the client follows.
pub const NEW_WAVE_EVENT: &str = "NewWave";

/// Topic hash of `NewWave(address,uint256,string)`.
pub fn new_wave_topic() -> B256 {
    NewWave::SIGNATURE_HASH
}

pub fn encode_get_all_waves() -> Vec<u8> {
    getAllWavesCall {}.abi_encode()
}

pub fn encode_get_total_waves() -> Vec<u8> {
    getTotalWavesCall {}.abi_encode()
}

pub fn encode_wave(message: &str) -> Vec<u8> {
    waveCall {
        _message: message.to_string(),
    }
    .abi_encode()
}

/// Decode the return data of `getAllWaves()`.
pub fn decode_all_waves(data: &[u8]) -> Result<Vec<RawWave>, ContractError> {
    let waves = getAllWavesCall::abi_decode_returns(data, true)
        .map_err(|e| ContractError::ChainRead(format!("Failed to decode getAllWaves: {}", e)))?
        ._0;

    waves
        .into_iter()
        .map(|wave| {
            Ok(RawWave {
                waver: wave.waver.to_checksum(None),
                timestamp: to_seconds(wave.timestamp)?,
                message: wave.message,
            })
        })
        .collect()
}

/// Decode the return data of `getTotalWaves()`.
pub fn decode_total_waves(data: &[u8]) -> Result<u64, ContractError> {
    let total = getTotalWavesCall::abi_decode_returns(data, true)
        .map_err(|e| ContractError::ChainRead(format!("Failed to decode getTotalWaves: {}", e)))?
        ._0;

    u64::try_from(total)
        .map_err(|_| ContractError::ChainRead(format!("Wave count {} does not fit in u64", total)))
}

/// Decode a `NewWave` log from its topics and data.
pub fn decode_new_wave(topics: Vec<B256>, data: Bytes) -> Result<RawWave, ContractError> {
    let log = LogData::new(topics, data)
        .ok_or_else(|| ContractError::ChainRead("Log has too many topics".to_string()))?;
    let event = NewWave::decode_log_data(&log, true)
        .map_err(|e| ContractError::ChainRead(format!("Failed to decode NewWave log: {}", e)))?;

    Ok(RawWave {
        waver: event.from.to_checksum(None),
        timestamp: to_seconds(event.timestamp)?,
        message: event.message,
    })
}

fn to_seconds(timestamp: U256) -> Result<u64, ContractError> {
    u64::try_from(timestamp)
        .map_err(|_| ContractError::ChainRead(format!("Timestamp {} does not fit in u64", timestamp)))
}
