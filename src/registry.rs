//! Handle Registry
//!
//! The single owner of every open Connection and Cursor.
//!
//! ## Responsibilities
//! - Allocate connection ids and cursor ids (two independent spaces)
//! - Resolve ids to live objects, failing with `InvalidHandle` otherwise
//! - Track the default connection (greatest open id)
//! - Enforce teardown order: cursors before their connection
//!
//! ## Id Allocation
//! Ids start at 1 and come from monotonic counters; an id is never handed
//! out twice by the same registry, so a stale handle fails instead of
//! silently addressing a newer store.

use std::collections::BTreeMap;
use std::path::Path;

use crate::codec::RecordCodec;
use crate::config::Config;
use crate::connection::{Connection, ConnectionId};
use crate::cursor::{Cursor, CursorId};
use crate::error::{KvError, Result};
use crate::ops::{Operation, Outcome};
use crate::storage::{DiskEngine, Engine};

/// Table of open connections and cursors
///
/// ## Concurrency Model
/// None internally. Every method takes `&mut self` for mutations; a host
/// that shares a registry across threads wraps it in its own lock.
pub struct Registry {
    config: Config,
    engine: Box<dyn Engine>,
    codec: RecordCodec,

    connections: BTreeMap<ConnectionId, Connection>,
    cursors: BTreeMap<CursorId, Cursor>,

    /// Last id handed out in each space
    last_connection_id: ConnectionId,
    last_cursor_id: CursorId,
}

impl Registry {
    /// Registry backed by the bundled disk engine
    pub fn new(config: Config) -> Result<Self> {
        let engine = DiskEngine::new(config.clone());
        Self::with_engine(config, engine)
    }

    /// Registry backed by any engine
    pub fn with_engine(config: Config, engine: impl Engine + 'static) -> Result<Self> {
        config.validate()?;
        let codec = RecordCodec::from_config(&config);

        tracing::debug!(
            engine = engine.name(),
            compress_values = codec.is_compressing(),
            "registry created"
        );

        Ok(Self {
            config,
            engine: Box::new(engine),
            codec,
            connections: BTreeMap::new(),
            cursors: BTreeMap::new(),
            last_connection_id: 0,
            last_cursor_id: 0,
        })
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Open the store at `path`, optionally inside the environment `env_dir`
    pub fn open(&mut self, path: impl AsRef<Path>, env_dir: Option<&Path>) -> Result<ConnectionId> {
        let path = path.as_ref();
        let id = self.allocate_connection_id()?;

        match Connection::open(id, self.engine.as_ref(), path, env_dir, self.codec) {
            Ok(connection) => {
                self.connections.insert(id, connection);
                Ok(id)
            }
            Err(fault) => {
                tracing::warn!(path = %path.display(), error = %fault, "open failed");
                Err(KvError::Open {
                    path: path.display().to_string(),
                    message: fault.message,
                })
            }
        }
    }

    /// Close a connection. Unknown ids are ignored.
    ///
    /// Fails with `ConnectionBusy` while cursors on it are registered; close
    /// them first (see [`Registry::close_cursors_of`]).
    pub fn close(&mut self, id: ConnectionId) -> Result<()> {
        if !self.connections.contains_key(&id) {
            return Ok(());
        }

        let cursors = self.cursors_of(id).len();
        if cursors > 0 {
            return Err(KvError::ConnectionBusy { id, cursors });
        }

        match self.connections.remove(&id) {
            Some(mut connection) => connection.release(),
            None => Ok(()),
        }
    }

    /// Most recently opened connection still open, or 0
    pub fn default_connection_id(&self) -> ConnectionId {
        self.connections.keys().next_back().copied().unwrap_or(0)
    }

    /// An explicit id, or the default connection when none is given
    pub fn resolve(&self, id: Option<ConnectionId>) -> ConnectionId {
        id.unwrap_or_else(|| self.default_connection_id())
    }

    pub fn get(&mut self, id: ConnectionId) -> Result<&mut Connection> {
        self.connections
            .get_mut(&id)
            .ok_or_else(|| KvError::invalid_connection(id))
    }

    /// Shared access for inspection (status, path)
    pub fn connection(&self, id: ConnectionId) -> Result<&Connection> {
        self.connections
            .get(&id)
            .ok_or_else(|| KvError::invalid_connection(id))
    }

    /// Open connection ids in ascending order
    pub fn list_open_connections(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    // =========================================================================
    // Cursors
    // =========================================================================

    /// Open a cursor on a connection's store
    pub fn open_cursor(&mut self, connection_id: ConnectionId) -> Result<CursorId> {
        let cursor_id = self.last_cursor_id.checked_add(1).ok_or_else(|| {
            KvError::Config("cursor id space exhausted".to_string())
        })?;

        let connection = self.get(connection_id)?;
        let cursor = connection.open_cursor(cursor_id).map_err(|e| match e {
            KvError::Store { code, message } => KvError::Store {
                code,
                message: format!("Failed to create a cursor: {}", message),
            },
            other => other,
        })?;

        self.last_cursor_id = cursor_id;
        self.cursors.insert(cursor_id, cursor);
        tracing::debug!(cursor = cursor_id, connection = connection_id, "cursor opened");
        Ok(cursor_id)
    }

    /// Close a cursor. Unknown ids are ignored.
    pub fn close_cursor(&mut self, cursor_id: CursorId) -> Result<()> {
        match self.cursors.remove(&cursor_id) {
            Some(mut cursor) => {
                tracing::debug!(cursor = cursor_id, "cursor closed");
                cursor.close()
            }
            None => Ok(()),
        }
    }

    pub fn get_cursor(&mut self, cursor_id: CursorId) -> Result<&mut Cursor> {
        self.cursors
            .get_mut(&cursor_id)
            .ok_or_else(|| KvError::invalid_cursor(cursor_id))
    }

    /// Open cursor ids in ascending order
    pub fn list_open_cursors(&self) -> Vec<CursorId> {
        self.cursors.keys().copied().collect()
    }

    /// Cursors bound to `connection_id`
    pub fn cursors_of(&self, connection_id: ConnectionId) -> Vec<CursorId> {
        self.cursors
            .values()
            .filter(|cursor| cursor.connection_id() == connection_id)
            .map(Cursor::id)
            .collect()
    }

    /// Close every cursor bound to `connection_id`. Returns how many closed.
    pub fn close_cursors_of(&mut self, connection_id: ConnectionId) -> Result<usize> {
        let ids = self.cursors_of(connection_id);
        let mut first_error = None;
        for id in &ids {
            if let Err(e) = self.close_cursor(*id) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(ids.len()),
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Close every cursor, then every connection
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_error = None;

        while let Some((id, mut cursor)) = self.cursors.pop_last() {
            if let Err(e) = cursor.close() {
                tracing::warn!(cursor = id, error = %e, "cursor close failed during teardown");
                first_error.get_or_insert(e);
            }
        }

        while let Some((id, mut connection)) = self.connections.pop_last() {
            if let Err(e) = connection.release() {
                tracing::warn!(id, error = %e, "connection close failed during teardown");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Command Execution
    // =========================================================================

    /// Execute one front-end operation
    pub fn execute(&mut self, operation: Operation) -> Result<Outcome> {
        crate::ops::execute(self, operation)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    fn allocate_connection_id(&mut self) -> Result<ConnectionId> {
        let id = self.last_connection_id.checked_add(1).ok_or_else(|| {
            KvError::Config("connection id space exhausted".to_string())
        })?;
        self.last_connection_id = id;
        Ok(id)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if let Err(e) = self.close_all() {
            tracing::warn!(error = %e, "registry teardown reported errors");
        }
    }
}
