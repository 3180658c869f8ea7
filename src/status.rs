//! Status codes
//!
//! Every Connection and Cursor remembers the status of its last engine call.
//! Zero is success, `NOT_FOUND` is the soft "no such key / end of key space"
//! outcome, and anything else is a fault reported by the engine (or
//! `UNDECODABLE` when the engine's bytes could not be decoded).

use std::fmt;

/// Success
pub const OK: i32 = 0;

/// Key absent, or cursor moved past either end of the key space
pub const NOT_FOUND: i32 = -30988;

/// Handle used after the underlying engine object was closed
pub const CLOSED: i32 = -30990;

/// Stored data failed an integrity check
pub const CORRUPT: i32 = -30973;

/// Stored file is not in a format this engine understands
pub const BAD_FORMAT: i32 = -30970;

/// Engine returned bytes the record codec could not decode
pub const UNDECODABLE: i32 = -30900;

/// Generic I/O failure (errno EIO) when the OS gave no code
pub const EIO: i32 = 5;

/// errno ENOTDIR
pub const ENOTDIR: i32 = 20;

/// Human-readable description of a status code
pub fn describe(code: i32) -> String {
    match code {
        OK => "Successful return: 0".to_string(),
        NOT_FOUND => "No matching key/data pair found".to_string(),
        CLOSED => "Handle has already been closed".to_string(),
        CORRUPT => "Stored data failed its integrity check".to_string(),
        BAD_FORMAT => "File is not in a recognized store format".to_string(),
        UNDECODABLE => "Record could not be decoded".to_string(),
        errno if errno > 0 => std::io::Error::from_raw_os_error(errno).to_string(),
        other => format!("Unknown error: {}", other),
    }
}

/// Status of the last engine call made through a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: i32,
    message: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: OK,
            message: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            code: NOT_FOUND,
            message: None,
        }
    }

    /// A fault with the engine's own message
    pub fn fault(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    /// Engine message if one was supplied, otherwise the generic description
    pub fn message(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => describe(self.code),
        }
    }

    /// True for success and for not-found; both are non-fault outcomes
    pub fn is_ok(&self) -> bool {
        self.code == OK || self.code == NOT_FOUND
    }

    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code)
    }
}
