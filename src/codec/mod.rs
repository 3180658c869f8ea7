//! Record Codec Module
//!
//! Converts keys and values between their in-memory form and the bytes
//! handed to the engine.
//!
//! ## Responsibilities
//! - Marshal any `serde` type to bytes and back (bincode, fixed-width ints)
//! - Keep keys uncompressed so the engine can compare them byte-wise
//! - Optionally compress values
//!
//! ## Compressed Value Frame
//! ```text
//! ┌──────────────────────┬──────────────────────────────┐
//! │ Uncompressed Len (4) │ zstd payload                 │
//! │ u32, little-endian   │                              │
//! └──────────────────────┴──────────────────────────────┘
//! ```
//! Without compression a value is the marshalled bytes with no framing.

mod record;

pub use record::{Record, RecordMode};

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::error::{KvError, Result};

/// Size of the uncompressed-length prefix of a compressed value
pub const FRAME_HEADER_SIZE: usize = 4;

/// Encodes keys and values for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCodec {
    /// zstd level, or None when values are stored uncompressed
    compression: Option<i32>,
}

impl RecordCodec {
    /// Codec that never compresses
    pub fn plain() -> Self {
        Self { compression: None }
    }

    /// Codec that compresses values at the given zstd level
    pub fn compressed(level: i32) -> Self {
        Self {
            compression: Some(level),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        if config.compress_values {
            Self::compressed(config.compression_level)
        } else {
            Self::plain()
        }
    }

    pub fn is_compressing(&self) -> bool {
        self.compression.is_some()
    }

    // =========================================================================
    // Keys
    // =========================================================================

    pub fn encode_key<K: Serialize + ?Sized>(&self, key: &K) -> Result<Vec<u8>> {
        serialize(key)
    }

    pub fn decode_key<K: DeserializeOwned>(&self, bytes: &[u8]) -> Result<K> {
        deserialize(bytes)
    }

    // =========================================================================
    // Values
    // =========================================================================

    pub fn encode_value<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>> {
        let binary = serialize(value)?;
        match self.compression {
            Some(level) => compress(&binary, level),
            None => Ok(binary),
        }
    }

    pub fn decode_value<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V> {
        match self.compression {
            Some(_) => deserialize(&decompress(bytes)?),
            None => deserialize(bytes),
        }
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// =============================================================================
// Marshalling
// =============================================================================

/// Fixed-width length prefixes, so string keys of equal length sort in their
/// natural byte order. Trailing garbage is malformed input.
fn marshaller() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    marshaller()
        .serialize(value)
        .map_err(|e| KvError::Codec(format!("Failed to serialize: {}", e)))
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    marshaller()
        .deserialize(bytes)
        .map_err(|e| KvError::Codec(format!("Failed to deserialize: {}", e)))
}

// =============================================================================
// Compression
// =============================================================================

#[cfg(feature = "compression")]
fn compress(binary: &[u8], level: i32) -> Result<Vec<u8>> {
    let original_len = u32::try_from(binary.len()).map_err(|_| {
        KvError::Codec(format!(
            "Value of {} bytes exceeds the compressed frame limit",
            binary.len()
        ))
    })?;

    let payload = zstd::bulk::compress(binary, level)
        .map_err(|e| KvError::Codec(format!("Failed to compress value: {}", e)))?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&original_len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

#[cfg(feature = "compression")]
fn decompress(frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() <= FRAME_HEADER_SIZE {
        return Err(KvError::Codec(format!(
            "Invalid compressed value: {} bytes is not larger than the {}-byte frame header",
            frame.len(),
            FRAME_HEADER_SIZE
        )));
    }

    let (header, payload) = frame.split_at(FRAME_HEADER_SIZE);
    let mut len_bytes = [0u8; FRAME_HEADER_SIZE];
    len_bytes.copy_from_slice(header);
    let original_len = u32::from_le_bytes(len_bytes) as usize;

    let binary = zstd::bulk::decompress(payload, original_len)
        .map_err(|e| KvError::Codec(format!("Failed to decompress value: {}", e)))?;

    if binary.len() != original_len {
        return Err(KvError::Codec(format!(
            "Decompressed {} bytes, frame declared {}",
            binary.len(),
            original_len
        )));
    }

    Ok(binary)
}

#[cfg(not(feature = "compression"))]
fn compress(_binary: &[u8], _level: i32) -> Result<Vec<u8>> {
    Err(KvError::Codec(
        "value compression is not available in this build".to_string(),
    ))
}

#[cfg(not(feature = "compression"))]
fn decompress(_frame: &[u8]) -> Result<Vec<u8>> {
    Err(KvError::Codec(
        "value compression is not available in this build".to_string(),
    ))
}
