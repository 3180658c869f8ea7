//! Record definitions
//!
//! The (key bytes, value bytes) unit exchanged with the engine.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

use super::RecordCodec;

/// How a record's buffers were set up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordMode {
    /// Both buffers are filled by the engine (cursor reads)
    #[default]
    Scratch,
    /// Key supplied by the caller, value filled by the engine (point reads)
    Lookup,
    /// Key and value supplied by the caller (writes)
    Store,
}

/// A key/value pair as seen at the engine boundary
///
/// Engine fills reuse the existing allocations, so a scratch record held by
/// a cursor grows to the largest pair it has seen and stays there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    mode: RecordMode,
    key: Vec<u8>,
    value: Vec<u8>,
    /// Set once the engine (or caller) has put data in the record
    filled: bool,
}

impl Record {
    /// Empty record for cursor traversal
    pub fn scratch() -> Self {
        Self::default()
    }

    /// Record for a point read of an already-encoded key
    pub fn lookup(key: Vec<u8>) -> Self {
        Self {
            mode: RecordMode::Lookup,
            key,
            value: Vec::new(),
            filled: false,
        }
    }

    /// Record for a write of an already-encoded pair
    pub fn store(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            mode: RecordMode::Store,
            key,
            value,
            filled: true,
        }
    }

    /// Encode `key` into a lookup record
    pub fn encode_lookup<K>(codec: &RecordCodec, key: &K) -> Result<Self>
    where
        K: Serialize + ?Sized,
    {
        Ok(Self::lookup(codec.encode_key(key)?))
    }

    /// Encode `key` and `value` into a store record
    pub fn encode_store<K, V>(codec: &RecordCodec, key: &K, value: &V) -> Result<Self>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        Ok(Self::store(codec.encode_key(key)?, codec.encode_value(value)?))
    }

    // =========================================================================
    // Engine-side access
    // =========================================================================

    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Whether the record currently holds a fetched or supplied pair
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Overwrite both buffers (cursor fetch)
    pub fn fill(&mut self, key: &[u8], value: &[u8]) {
        self.key.clear();
        self.key.extend_from_slice(key);
        self.fill_value(value);
    }

    /// Overwrite the value buffer (point read)
    pub fn fill_value(&mut self, value: &[u8]) {
        self.value.clear();
        self.value.extend_from_slice(value);
        self.filled = true;
    }

    // =========================================================================
    // Caller-side access
    // =========================================================================

    pub fn decode_key<K: DeserializeOwned>(&self, codec: &RecordCodec) -> Result<K> {
        codec.decode_key(&self.key)
    }

    pub fn decode_value<V: DeserializeOwned>(&self, codec: &RecordCodec) -> Result<V> {
        codec.decode_value(&self.value)
    }
}
