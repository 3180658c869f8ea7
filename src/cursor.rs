//! Cursor
//!
//! Ordered, resumable traversal bound to one store.
//!
//! ## States
//! ```text
//!   Unopened ──open──▶ Open ──close──▶ Closed
//!      │                 │
//!      └── open fails ───┘ (stays Unopened)
//! ```
//! `next`/`prev` are only valid while Open. Reaching either end of the key
//! space is `Step::Exhausted`, not a fault, and leaves the held record as it
//! was.

use serde::de::DeserializeOwned;

use crate::codec::{Record, RecordCodec};
use crate::connection::ConnectionId;
use crate::error::{KvError, Result};
use crate::status::Status;
use crate::storage::{EngineCursor, Store};

/// Registry-assigned cursor id
pub type CursorId = u32;

/// Outcome of a traversal step that did not fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A new record was fetched into the cursor
    Advanced,
    /// No record in that direction
    Exhausted,
}

impl Step {
    pub fn advanced(self) -> bool {
        self == Step::Advanced
    }
}

enum State {
    Unopened,
    Open(Box<dyn EngineCursor>),
    Closed,
}

/// A cursor over one connection's store
pub struct Cursor {
    id: CursorId,
    connection_id: ConnectionId,
    state: State,
    /// Most recently fetched record
    record: Record,
    codec: RecordCodec,
    status: Status,
}

impl Cursor {
    pub fn new(id: CursorId, connection_id: ConnectionId, codec: RecordCodec) -> Self {
        Self {
            id,
            connection_id,
            state: State::Unopened,
            record: Record::scratch(),
            codec,
            status: Status::ok(),
        }
    }

    /// Request an engine cursor from `store`
    ///
    /// Opening an already open cursor is a no-op; a closed cursor cannot be
    /// reopened.
    pub fn open(&mut self, store: &dyn Store) -> Result<()> {
        match self.state {
            State::Open(_) => return Ok(()),
            State::Closed => return Err(KvError::invalid_cursor(self.id)),
            State::Unopened => {}
        }

        match store.cursor() {
            Ok(engine_cursor) => {
                self.state = State::Open(engine_cursor);
                self.status = Status::ok();
                Ok(())
            }
            Err(fault) => {
                self.status = Status::fault(fault.code, fault.message.clone());
                Err(fault.into())
            }
        }
    }

    /// Step to the next record in key order
    pub fn next(&mut self) -> Result<Step> {
        self.step(true)
    }

    /// Step to the previous record in key order
    pub fn prev(&mut self) -> Result<Step> {
        self.step(false)
    }

    fn step(&mut self, forward: bool) -> Result<Step> {
        let engine_cursor = match &mut self.state {
            State::Open(engine_cursor) => engine_cursor,
            _ => return Err(KvError::invalid_cursor(self.id)),
        };

        let result = if forward {
            engine_cursor.next(&mut self.record)
        } else {
            engine_cursor.prev(&mut self.record)
        };

        match result {
            Ok(true) => {
                self.status = Status::ok();
                Ok(Step::Advanced)
            }
            Ok(false) => {
                self.status = Status::not_found();
                Ok(Step::Exhausted)
            }
            Err(fault) => {
                tracing::warn!(cursor = self.id, error = %fault, "cursor step failed");
                self.status = Status::fault(fault.code, fault.message.clone());
                Err(fault.into())
            }
        }
    }

    /// Release the engine cursor. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(mut engine_cursor) => engine_cursor.close().map_err(|fault| {
                self.status = Status::fault(fault.code, fault.message.clone());
                KvError::from(fault)
            }),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Held record
    // =========================================================================

    /// The raw record fetched by the last successful step
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Decoded key and value of the held record, None before the first fetch
    pub fn current<K, V>(&self) -> Result<Option<(K, V)>>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        self.ensure_usable()?;
        if !self.record.is_filled() {
            return Ok(None);
        }
        let key = self.record.decode_key(&self.codec)?;
        let value = self.record.decode_value(&self.codec)?;
        Ok(Some((key, value)))
    }

    /// Decoded key of the held record, None before the first fetch
    pub fn current_key<K: DeserializeOwned>(&self) -> Result<Option<K>> {
        self.ensure_usable()?;
        if !self.record.is_filled() {
            return Ok(None);
        }
        self.record.decode_key(&self.codec).map(Some)
    }

    fn ensure_usable(&self) -> Result<()> {
        match self.state {
            State::Closed => Err(KvError::invalid_cursor(self.id)),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> CursorId {
        self.id
    }

    /// Connection whose store this cursor traverses
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    pub fn last_status(&self) -> &Status {
        &self.status
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(cursor = self.id, error = %e, "cursor close failed");
        }
    }
}
