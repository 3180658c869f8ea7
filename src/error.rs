//! Error types for handlekv
//!
//! Provides a unified error type for all operations.
//!
//! Not-found is deliberately absent from this enum: a missing key is an
//! expected outcome of `get`/`delete`/`exists` and is carried in the
//! returned value, never raised as an error.

use std::fmt;

use thiserror::Error;

use crate::storage::EngineFault;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Which id space a handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Connection,
    Cursor,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::Connection => f.write_str("session"),
            HandleKind::Cursor => f.write_str("cursor"),
        }
    }
}

/// Unified error type for handlekv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Handle Errors
    // -------------------------------------------------------------------------
    #[error("Invalid {kind} id: {id}. Did you open the {kind}?")]
    InvalidHandle { kind: HandleKind, id: u32 },

    #[error("Session {id} still has {cursors} open cursor(s)")]
    ConnectionBusy { id: u32, cursors: usize },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Unable to open {path}: {message}")]
    Open { path: String, message: String },

    #[error("Store error ({code}): {message}")]
    Store { code: i32, message: String },

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Front End Errors
    // -------------------------------------------------------------------------
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    pub(crate) fn invalid_connection(id: u32) -> Self {
        KvError::InvalidHandle {
            kind: HandleKind::Connection,
            id,
        }
    }

    pub(crate) fn invalid_cursor(id: u32) -> Self {
        KvError::InvalidHandle {
            kind: HandleKind::Cursor,
            id,
        }
    }
}

impl From<EngineFault> for KvError {
    fn from(fault: EngineFault) -> Self {
        KvError::Store {
            code: fault.code,
            message: fault.message,
        }
    }
}
