//! Outcome definitions
//!
//! Represents the result of an operation, renderable as text.

use std::fmt;

use crate::connection::{ConnectionId, Removal};
use crate::cursor::{CursorId, Step};
use crate::storage::StoreStat;

/// Result of a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to report
    Done,
    Opened(ConnectionId),
    CursorOpened(CursorId),
    /// `None` is the absent sentinel
    Value(Option<String>),
    Removal(Removal),
    Exists(bool),
    Stat(StoreStat),
    Keys(Vec<String>),
    Values(Vec<String>),
    Step(Step),
    Record {
        key: String,
        value: Option<String>,
    },
    /// Cursor has not fetched anything yet
    NoRecord,
    Handles {
        connections: Vec<ConnectionId>,
        cursors: Vec<CursorId>,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => f.write_str("ok"),
            Outcome::Opened(id) => write!(f, "#{}", id),
            Outcome::CursorOpened(id) => write!(f, "cursor {}", id),
            Outcome::Value(Some(value)) => f.write_str(value),
            Outcome::Value(None) => f.write_str("(empty)"),
            Outcome::Removal(Removal::Removed) => f.write_str("deleted"),
            Outcome::Removal(Removal::Absent) => f.write_str("absent"),
            Outcome::Exists(found) => write!(f, "{}", found),
            Outcome::Stat(stat) => write!(f, "{}", stat),
            Outcome::Keys(items) | Outcome::Values(items) => f.write_str(&items.join("\n")),
            Outcome::Step(Step::Advanced) => f.write_str("true"),
            Outcome::Step(Step::Exhausted) => f.write_str("false"),
            Outcome::Record { key, value: Some(value) } => write!(f, "{} => {}", key, value),
            Outcome::Record { key, value: None } => f.write_str(key),
            Outcome::NoRecord => f.write_str("(no record)"),
            Outcome::Handles {
                connections,
                cursors,
            } => write!(f, "sessions: {:?}\ncursors: {:?}", connections, cursors),
        }
    }
}
