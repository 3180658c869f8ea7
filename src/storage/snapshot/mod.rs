//! Snapshot Module
//!
//! The store file of the bundled disk engine: every live record, sorted.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "HKVS" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry, ascending key order ...  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   DataEnd: u64 (8) | DataCRC: u32 (4) | Padding (4)     │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod builder;
mod reader;

use std::path::PathBuf;

pub use builder::SnapshotBuilder;
pub use reader::SnapshotReader;

// =============================================================================
// Shared Constants (used by builder and reader)
// =============================================================================

/// Magic bytes identifying a handlekv store file
pub const MAGIC: &[u8; 4] = b"HKVS";

/// Current store file format version
pub const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: DataEnd (8) + DataCRC (4) + Padding (4) = 16 bytes
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Magic as the number `stat()` reports
pub fn magic_number() -> u32 {
    u32::from_le_bytes(*MAGIC)
}

/// What a finished snapshot write produced
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// Path to the store file
    pub path: PathBuf,
    /// Number of records written
    pub entry_count: u64,
    /// File size in bytes
    pub file_size: u64,
}
