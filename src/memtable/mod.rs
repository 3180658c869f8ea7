//! MemTable Module
//!
//! In-memory ordered table holding the live records of one store.
//!
//! ## Responsibilities
//! - Point reads and writes in byte-lexicographic key order
//! - Positional stepping (`next_after` / `prev_before`) for cursors
//! - Track size for page-count statistics
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in a parking_lot RwLock:
//! - Ordered keys (cursor traversal, snapshot writes)
//! - Cursors keep a `Weak` to the table and re-seek from their last key,
//!   so writes between steps never invalidate a cursor

mod table;

pub use table::MemTable;

/// A key/value pair copied out of the table
pub type Entry = (Vec<u8>, Vec<u8>);
