//! JSON codec for relay records.
//!
//! Centralizes serialization so every component encodes relay traffic the
//! same way. The relay channel is text-based (key-tagged JSON records), so
//! the codec works in `String`s rather than byte buffers.
//!
//! Error payloads are `String`s rather than structured variants:
//! `serde_json` errors are opaque, decode failures only happen on garbage
//! from the relay (an exceptional, cold path), and preserving the formatted
//! message keeps the diagnostics that would otherwise be lost.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// Errors produced while encoding or decoding relay records.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The record could not be serialized.
    Encode {
        /// The underlying serializer message.
        message: String,
    },
    /// The text could not be parsed as a known record.
    Decode {
        /// The underlying parser message.
        message: String,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode { message } => write!(f, "failed to encode relay record: {}", message),
            Self::Decode { message } => write!(f, "failed to decode relay record: {}", message),
        }
    }
}

impl std::error::Error for CodecError {}

/// Encodes a record as a single-line JSON string.
///
/// # Errors
/// Returns [`CodecError::Encode`] if serialization fails (which for the
/// record types in this crate indicates a bug, not bad input).
pub fn encode<M>(record: &M) -> Result<String, CodecError>
where
    M: Serialize,
{
    serde_json::to_string(record).map_err(|e| CodecError::Encode {
        message: e.to_string(),
    })
}

/// Decodes a record from JSON text.
///
/// # Errors
/// Returns [`CodecError::Decode`] on malformed input. Callers ingesting
/// relay traffic should treat this as "discard and log", not as fatal.
pub fn decode<M>(text: &str) -> Result<M, CodecError>
where
    M: DeserializeOwned,
{
    serde_json::from_str(text).map_err(|e| CodecError::Decode {
        message: e.to_string(),
    })
}

// #########
// # TESTS #
// #########
