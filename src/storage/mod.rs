//! Storage Module
//!
//! The boundary between the handle layer and an ordered key-value engine.
//!
//! ## Responsibilities
//! - Define the engine contract (`Engine`, `Environment`, `Store`, `EngineCursor`)
//! - Carry engine faults with their native code and message
//! - Ship one concrete engine (`DiskEngine`) so the crate works standalone
//!
//! ## Contract
//! ```text
//!   Engine ──open_environment──▶ Environment   (optional, acquired first)
//!     │
//!     └────open_store─────────▶ Store ──cursor──▶ EngineCursor
//! ```
//! Not-found is never a fault: lookups return `false`, cursors return
//! `false` at either end of the key space and leave the record untouched.
//! Release order is the reverse of acquisition: cursors, store, environment.

mod disk;
mod env;
pub mod snapshot;

use std::fmt;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::codec::Record;
use crate::error::KvError;
use crate::status;

pub use disk::{DiskCursor, DiskEngine, DiskStore};
pub use env::DiskEnvironment;

/// Result of an engine call
pub type EngineResult<T> = std::result::Result<T, EngineFault>;

/// A fault reported by the engine (anything other than success or not-found)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({code})")]
pub struct EngineFault {
    pub code: i32,
    pub message: String,
}

impl EngineFault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Fault for a call made on an already closed engine object
    pub fn closed(what: &str) -> Self {
        Self::new(status::CLOSED, format!("{} has already been closed", what))
    }
}

impl From<std::io::Error> for EngineFault {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.raw_os_error().unwrap_or(status::EIO), e.to_string())
    }
}

impl From<KvError> for EngineFault {
    fn from(e: KvError) -> Self {
        match e {
            KvError::Store { code, message } => Self::new(code, message),
            KvError::Io(e) => e.into(),
            KvError::WalCorruption(message) => Self::new(status::CORRUPT, message),
            other => Self::new(status::EIO, other.to_string()),
        }
    }
}

/// Engine-reported statistics for one store
///
/// Counts are a snapshot: treat them as preallocation hints, not as
/// the exact number of records a later scan will see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStat {
    pub magic: u32,
    pub min_keys_per_page: u32,
    pub record_count: u64,
    pub key_count: u64,
    pub page_count: u64,
    pub page_size: u32,
    pub fixed_record_len: u32,
    pub fixed_record_pad: u32,
    pub version: u32,
}

impl fmt::Display for StoreStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "magic: {:#010x}", self.magic)?;
        writeln!(f, "minkey: {}", self.min_keys_per_page)?;
        writeln!(f, "ndata: {}", self.record_count)?;
        writeln!(f, "nkeys: {}", self.key_count)?;
        writeln!(f, "pagecnt: {}", self.page_count)?;
        writeln!(f, "pagesize: {}", self.page_size)?;
        writeln!(f, "re_len: {}", self.fixed_record_len)?;
        writeln!(f, "re_pad: {}", self.fixed_record_pad)?;
        write!(f, "version: {}", self.version)
    }
}

// =============================================================================
// Engine Contract
// =============================================================================

/// Factory for environments and stores
pub trait Engine: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &'static str;

    /// Open (creating if needed) a transactional environment rooted at `home`
    fn open_environment(&self, home: &Path) -> EngineResult<Box<dyn Environment>>;

    /// Open (creating if needed) the store at `path`, optionally inside `env`
    fn open_store(
        &self,
        path: &Path,
        env: Option<&dyn Environment>,
    ) -> EngineResult<Box<dyn Store>>;
}

/// Shared context (logs, locks) stores can be opened within
pub trait Environment: Send {
    fn home(&self) -> &Path;

    /// Release the environment. Every store opened in it must be closed first.
    fn close(&mut self) -> EngineResult<()>;
}

/// One open ordered store
pub trait Store: Send {
    /// Fill `record`'s value for its key. Returns false if the key is absent.
    fn get(&self, record: &mut Record) -> EngineResult<bool>;

    fn put(&mut self, record: &Record) -> EngineResult<()>;

    /// Remove `record`'s key. Returns false if the key was absent.
    fn delete(&mut self, record: &Record) -> EngineResult<bool>;

    fn exists(&self, record: &Record) -> EngineResult<bool>;

    fn stat(&self) -> EngineResult<StoreStat>;

    /// Reclaim free space
    fn compact(&mut self) -> EngineResult<()>;

    /// Flush pending writes to stable storage
    fn sync(&mut self) -> EngineResult<()>;

    /// Open an unpositioned cursor over the store
    fn cursor(&self) -> EngineResult<Box<dyn EngineCursor>>;

    fn close(&mut self) -> EngineResult<()>;
}

/// Engine-level ordered cursor
pub trait EngineCursor: Send {
    /// Step forward and fill `record`. Returns false past the last key.
    fn next(&mut self, record: &mut Record) -> EngineResult<bool>;

    /// Step backward and fill `record`. Returns false before the first key.
    fn prev(&mut self, record: &mut Record) -> EngineResult<bool>;

    fn close(&mut self) -> EngineResult<()>;
}
