//! # handlekv
//!
//! An embedded, handle-addressed key-value access layer with:
//! - Small integer handles for open stores (connections) and cursors
//! - serde/bincode record encoding with optional zstd value compression
//! - Ordered, resumable cursors
//! - A pluggable engine boundary, with a bundled disk engine
//!   (snapshot file + write-ahead log inside an environment)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Operation Layer (ops / handlekv-cli)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Handle Registry                           │
//! │         (connection ids / cursor ids, default id)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Connection  │◀─────────│   Cursor    │
//!   │   (Store)   │          │             │
//!   └──────┬──────┘          └─────────────┘
//!          │  Record Codec (bincode + zstd)
//!          ▼
//!   ┌─────────────────────────────────────┐
//!   │        Engine (DiskEngine)          │
//!   │  MemTable ─ WAL ─ Snapshot file     │
//!   └─────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```no_run
//! use handlekv::{Config, Registry};
//!
//! # fn main() -> handlekv::Result<()> {
//! let mut registry = Registry::new(Config::default())?;
//! let id = registry.open("people.db", None)?;
//! registry.get(id)?.put("alice", &42u32)?;
//! let age: Option<u32> = registry.get(id)?.get("alice")?;
//! assert_eq!(age, Some(42));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod status;

pub mod codec;
pub mod memtable;
pub mod wal;
pub mod storage;

pub mod connection;
pub mod cursor;
pub mod registry;
pub mod ops;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HandleKind, KvError, Result};
pub use config::{Config, WalSyncStrategy};
pub use status::Status;
pub use codec::{Record, RecordCodec, RecordMode};
pub use storage::{DiskEngine, Engine, StoreStat};
pub use connection::{Connection, ConnectionId, Removal};
pub use cursor::{Cursor, CursorId, Step};
pub use registry::Registry;
pub use ops::{Operation, Outcome};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of handlekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
