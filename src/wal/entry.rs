//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{KvError, Result};

/// Entry header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

/// Payload stored after the header (the LSN lives in the header only)
#[derive(Serialize, Deserialize)]
struct Body {
    timestamp: u64,
    operation: Operation,
}

impl WalEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode as `[lsn][crc][len][data]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = self.body_bytes()?;
        let len = u32::try_from(data.len()).map_err(|_| {
            KvError::Serialization(format!("WAL entry of {} bytes is too large", data.len()))
        })?;
        let crc = Self::checksum(self.lsn, len, &data);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.put_u64_le(self.lsn);
        bytes.put_u32_le(crc);
        bytes.put_u32_le(len);
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Decode one entry from the front of `bytes`
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(KvError::WalCorruption(format!(
                "entry header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut header = &bytes[..HEADER_SIZE];
        let lsn = header.get_u64_le();
        let crc = header.get_u32_le();
        let len = header.get_u32_le();

        let end = HEADER_SIZE + len as usize;
        if bytes.len() < end {
            return Err(KvError::WalCorruption(format!(
                "entry {} truncated: expected {} data bytes, got {}",
                lsn,
                len,
                bytes.len() - HEADER_SIZE
            )));
        }

        let data = &bytes[HEADER_SIZE..end];
        if Self::checksum(lsn, len, data) != crc {
            return Err(KvError::WalCorruption(format!(
                "CRC mismatch in entry {}",
                lsn
            )));
        }

        let body: Body = bincode::deserialize(data)
            .map_err(|e| KvError::WalCorruption(format!("entry {}: {}", lsn, e)))?;

        Ok(Self {
            lsn,
            operation: body.operation,
            timestamp: body.timestamp,
        })
    }

    /// Total encoded size including the header
    pub fn serialized_size(&self) -> Result<usize> {
        Ok(HEADER_SIZE + self.body_bytes()?.len())
    }

    fn body_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(&Body {
            timestamp: self.timestamp,
            operation: self.operation.clone(),
        })
        .map_err(|e| KvError::Serialization(e.to_string()))
    }

    pub(super) fn checksum(lsn: u64, len: u32, data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(&len.to_le_bytes());
        hasher.update(data);
        hasher.finalize()
    }
}
