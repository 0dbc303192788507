//! Frame encoding for both directions. Binary frames carry bincode,
//! text frames carry JSON.

use bincode::{Decode, Encode};
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("bincode encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("bincode decode failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("json decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

pub fn encode_binary<T: Encode>(message: &T) -> Result<Vec<u8>, WireError> {
    Ok(bincode::encode_to_vec(message, bincode::config::standard())?)
}

pub fn decode_binary<T: Decode<()>>(payload: &[u8]) -> Result<T, WireError> {
    let (message, read) = bincode::decode_from_slice(payload, bincode::config::standard())?;
    if read != payload.len() {
        return Err(WireError::TrailingBytes(payload.len() - read));
    }
    Ok(message)
}

pub fn encode_json<T: serde::Serialize>(message: &T) -> Result<String, WireError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T, WireError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;
