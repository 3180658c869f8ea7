//! Operation definitions
//!
//! Represents one already-validated call into the registry.

use std::path::PathBuf;

use crate::connection::ConnectionId;
use crate::cursor::CursorId;

/// A parsed operation. `id: None` means the default connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Open {
        path: PathBuf,
        env_dir: Option<PathBuf>,
    },
    Close {
        id: Option<ConnectionId>,
    },
    Get {
        id: Option<ConnectionId>,
        key: String,
    },
    Put {
        id: Option<ConnectionId>,
        key: String,
        value: String,
    },
    Delete {
        id: Option<ConnectionId>,
        key: String,
    },
    Exists {
        id: Option<ConnectionId>,
        key: String,
    },
    Stat {
        id: Option<ConnectionId>,
    },
    Keys {
        id: Option<ConnectionId>,
    },
    Values {
        id: Option<ConnectionId>,
    },
    Compact {
        id: Option<ConnectionId>,
    },
    Sync {
        id: Option<ConnectionId>,
    },
    /// Open connection and cursor ids
    List,
    CursorOpen {
        id: Option<ConnectionId>,
    },
    CursorClose {
        cursor: CursorId,
    },
    CursorNext {
        cursor: CursorId,
    },
    CursorPrev {
        cursor: CursorId,
    },
    CursorGet {
        cursor: CursorId,
        with_value: bool,
    },
}

impl Operation {
    /// Verb used in the text syntax
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Open { .. } => "open",
            Operation::Close { .. } => "close",
            Operation::Get { .. } => "get",
            Operation::Put { .. } => "put",
            Operation::Delete { .. } => "delete",
            Operation::Exists { .. } => "exists",
            Operation::Stat { .. } => "stat",
            Operation::Keys { .. } => "keys",
            Operation::Values { .. } => "values",
            Operation::Compact { .. } => "compact",
            Operation::Sync { .. } => "sync",
            Operation::List => "list",
            Operation::CursorOpen { .. } => "cursor_open",
            Operation::CursorClose { .. } => "cursor_close",
            Operation::CursorNext { .. } => "cursor_next",
            Operation::CursorPrev { .. } => "cursor_prev",
            Operation::CursorGet { .. } => "cursor_get",
        }
    }
}
