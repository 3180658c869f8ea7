//! Operations Module
//!
//! Front-end vocabulary over the registry: one `Operation` per call a host
//! can make, one `Outcome` per result, and a line-oriented text syntax.
//!
//! ## Text Syntax
//! ```text
//! verb [#connection-id] arguments...
//!
//! open <path> [env-dir]          close [#id]
//! get [#id] <key>                put [#id] <key> <value>
//! delete [#id] <key>             exists [#id] <key>
//! stat [#id]   keys [#id]   values [#id]   compact [#id]   sync [#id]
//! list
//! cursor_open [#id]              cursor_close <cursor>
//! cursor_next <cursor>           cursor_prev <cursor>
//! cursor_get <cursor> [--key-only]
//! ```
//! Arguments are separated by whitespace; double quotes group words.
//! Keys and values are text at this layer.

mod operation;
mod outcome;
mod parse;

pub use operation::Operation;
pub use outcome::Outcome;
pub use parse::tokenize;

use crate::error::Result;
use crate::registry::Registry;

/// Run one operation against the registry
pub fn execute(registry: &mut Registry, operation: Operation) -> Result<Outcome> {
    tracing::trace!(?operation, "execute");

    let outcome = match operation {
        Operation::Open { path, env_dir } => {
            Outcome::Opened(registry.open(&path, env_dir.as_deref())?)
        }
        Operation::Close { id } => {
            let id = registry.resolve(id);
            registry.close(id)?;
            Outcome::Done
        }
        Operation::Get { id, key } => {
            let id = registry.resolve(id);
            Outcome::Value(registry.get(id)?.get::<str, String>(key.as_str())?)
        }
        Operation::Put { id, key, value } => {
            let id = registry.resolve(id);
            registry.get(id)?.put::<str, str>(key.as_str(), value.as_str())?;
            Outcome::Done
        }
        Operation::Delete { id, key } => {
            let id = registry.resolve(id);
            Outcome::Removal(registry.get(id)?.delete::<str>(key.as_str())?)
        }
        Operation::Exists { id, key } => {
            let id = registry.resolve(id);
            Outcome::Exists(registry.get(id)?.exists::<str>(key.as_str())?)
        }
        Operation::Stat { id } => {
            let id = registry.resolve(id);
            Outcome::Stat(registry.get(id)?.stat()?)
        }
        Operation::Keys { id } => {
            let id = registry.resolve(id);
            Outcome::Keys(registry.get(id)?.keys::<String>()?)
        }
        Operation::Values { id } => {
            let id = registry.resolve(id);
            Outcome::Values(registry.get(id)?.values::<String>()?)
        }
        Operation::Compact { id } => {
            let id = registry.resolve(id);
            registry.get(id)?.compact()?;
            Outcome::Done
        }
        Operation::Sync { id } => {
            let id = registry.resolve(id);
            registry.get(id)?.sync()?;
            Outcome::Done
        }
        Operation::List => Outcome::Handles {
            connections: registry.list_open_connections(),
            cursors: registry.list_open_cursors(),
        },
        Operation::CursorOpen { id } => {
            let id = registry.resolve(id);
            Outcome::CursorOpened(registry.open_cursor(id)?)
        }
        Operation::CursorClose { cursor } => {
            registry.close_cursor(cursor)?;
            Outcome::Done
        }
        Operation::CursorNext { cursor } => Outcome::Step(registry.get_cursor(cursor)?.next()?),
        Operation::CursorPrev { cursor } => Outcome::Step(registry.get_cursor(cursor)?.prev()?),
        Operation::CursorGet { cursor, with_value } => {
            let cursor = registry.get_cursor(cursor)?;
            if with_value {
                match cursor.current::<String, String>()? {
                    Some((key, value)) => Outcome::Record {
                        key,
                        value: Some(value),
                    },
                    None => Outcome::NoRecord,
                }
            } else {
                match cursor.current_key::<String>()? {
                    Some(key) => Outcome::Record { key, value: None },
                    None => Outcome::NoRecord,
                }
            }
        }
    };

    Ok(outcome)
}
