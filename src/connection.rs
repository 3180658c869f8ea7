//! Connection
//!
//! One open store, plus the environment it was opened in (if any).
//!
//! ## Responsibilities
//! - Encode keys/values through the record codec on the way in and out
//! - Translate engine outcomes into the get/put/delete/exists/... contract
//! - Remember the status of the last engine call, including failures to
//!   decode what it returned
//! - Release store before environment, exactly once

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Record, RecordCodec};
use crate::cursor::{Cursor, CursorId, Step};
use crate::error::{KvError, Result};
use crate::status::{self, Status};
use crate::storage::{Engine, EngineFault, EngineResult, Environment, Store, StoreStat};

/// Registry-assigned connection id (0 means "none")
pub type ConnectionId = u32;

/// Upper bound on what `keys()`/`values()` reserve up front
const MAX_PREALLOCATION: usize = 64 * 1024;

/// What `delete` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// The key was not present; not a fault
    Absent,
}

/// An open store
pub struct Connection {
    id: ConnectionId,
    path: PathBuf,
    env_dir: Option<PathBuf>,

    /// Taken (and closed) before `env` on release
    store: Option<Box<dyn Store>>,
    env: Option<Box<dyn Environment>>,

    codec: RecordCodec,
    status: Status,
}

impl Connection {
    /// Acquire the environment (if requested), then the store
    pub(crate) fn open(
        id: ConnectionId,
        engine: &dyn Engine,
        path: &Path,
        env_dir: Option<&Path>,
        codec: RecordCodec,
    ) -> EngineResult<Self> {
        let env = match env_dir {
            Some(home) => Some(engine.open_environment(home)?),
            None => None,
        };

        // On failure `env` drops here, releasing it
        let store = engine.open_store(path, env.as_deref())?;

        tracing::debug!(
            id,
            path = %path.display(),
            env = ?env_dir,
            engine = engine.name(),
            "connection opened"
        );

        Ok(Self {
            id,
            path: path.to_path_buf(),
            env_dir: env_dir.map(Path::to_path_buf),
            store: Some(store),
            env,
            codec,
            status: Status::ok(),
        })
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Look up `key`. `None` is the absent sentinel, not a fault.
    pub fn get<K, V>(&mut self, key: &K) -> Result<Option<V>>
    where
        K: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        let mut record = Record::encode_lookup(&self.codec, key)?;
        if !self.call(|store| store.get(&mut record))? {
            self.status = Status::not_found();
            return Ok(None);
        }
        let value = record.decode_value(&self.codec);
        self.decoded(value).map(Some)
    }

    /// Insert or overwrite `key`
    pub fn put<K, V>(&mut self, key: &K, value: &V) -> Result<()>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        let record = Record::encode_store(&self.codec, key, value)?;
        self.call(|store| store.put(&record))
    }

    /// Remove `key`; an absent key is reported, not raised
    pub fn delete<K: Serialize + ?Sized>(&mut self, key: &K) -> Result<Removal> {
        let record = Record::encode_lookup(&self.codec, key)?;
        if self.call(|store| store.delete(&record))? {
            Ok(Removal::Removed)
        } else {
            self.status = Status::not_found();
            Ok(Removal::Absent)
        }
    }

    pub fn exists<K: Serialize + ?Sized>(&mut self, key: &K) -> Result<bool> {
        let record = Record::encode_lookup(&self.codec, key)?;
        let found = self.call(|store| store.exists(&record))?;
        if !found {
            self.status = Status::not_found();
        }
        Ok(found)
    }

    // =========================================================================
    // Whole-Store Operations
    // =========================================================================

    /// Engine statistics snapshot
    pub fn stat(&mut self) -> Result<StoreStat> {
        self.call(|store| store.stat())
    }

    /// Keys in store order, at most `stat().key_count` of them
    pub fn keys<K: DeserializeOwned>(&mut self) -> Result<Vec<K>> {
        let limit = self.stat()?.key_count;
        self.collect(limit, |record, codec| record.decode_key(codec))
    }

    /// Values in key order, at most `stat().record_count` of them
    pub fn values<V: DeserializeOwned>(&mut self) -> Result<Vec<V>> {
        let limit = self.stat()?.record_count;
        self.collect(limit, |record, codec| record.decode_value(codec))
    }

    /// Scan with an internal cursor until exhaustion or `limit` items
    ///
    /// The limit comes from a statistics snapshot taken before the scan, so
    /// records added after it are not returned.
    fn collect<T>(
        &mut self,
        limit: u64,
        decode: impl Fn(&Record, &RecordCodec) -> Result<T>,
    ) -> Result<Vec<T>> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut cursor = self.open_cursor(0)?;
        let mut items = Vec::with_capacity(limit.min(MAX_PREALLOCATION));

        while items.len() < limit {
            match cursor.next() {
                Ok(Step::Advanced) => {
                    let item = decode(cursor.record(), &self.codec);
                    items.push(self.decoded(item)?);
                }
                Ok(Step::Exhausted) => break,
                Err(e) => {
                    self.status = cursor.last_status().clone();
                    return Err(e);
                }
            }
        }

        self.status = cursor.last_status().clone();
        cursor.close()?;
        Ok(items)
    }

    /// Ask the engine to reclaim free space
    pub fn compact(&mut self) -> Result<()> {
        self.call(|store| store.compact())
    }

    /// Flush pending writes to stable storage
    pub fn sync(&mut self) -> Result<()> {
        self.call(|store| store.sync())
    }

    /// Open a cursor on this store with the given id
    pub(crate) fn open_cursor(&mut self, cursor_id: CursorId) -> Result<Cursor> {
        let store = self
            .store
            .as_deref()
            .ok_or_else(|| KvError::invalid_connection(self.id))?;

        let mut cursor = Cursor::new(cursor_id, self.id, self.codec);
        let opened = cursor.open(store);
        self.status = cursor.last_status().clone();
        opened.map(|()| cursor)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the store, then the environment. Safe to call more than once.
    pub(crate) fn release(&mut self) -> Result<()> {
        let mut first_error: Option<EngineFault> = None;

        if let Some(mut store) = self.store.take() {
            if let Err(fault) = store.close() {
                first_error.get_or_insert(fault);
            }
        }

        if let Some(mut env) = self.env.take() {
            if let Err(fault) = env.close() {
                first_error.get_or_insert(fault);
            }
        }

        match first_error {
            Some(fault) => {
                self.status = Status::fault(fault.code, fault.message.clone());
                Err(fault.into())
            }
            None => {
                tracing::debug!(id = self.id, path = %self.path.display(), "connection closed");
                Ok(())
            }
        }
    }

    /// Record a failed decode of engine output as this call's status
    fn decoded<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.status = Status::fault(status::UNDECODABLE, e.to_string());
        }
        result
    }

    /// Run an engine call and record its status
    fn call<T>(&mut self, op: impl FnOnce(&mut dyn Store) -> EngineResult<T>) -> Result<T> {
        let store = self
            .store
            .as_deref_mut()
            .ok_or_else(|| KvError::invalid_connection(self.id))?;

        match op(store) {
            Ok(value) => {
                self.status = Status::ok();
                Ok(value)
            }
            Err(fault) => {
                tracing::warn!(id = self.id, error = %fault, "store operation failed");
                self.status = Status::fault(fault.code, fault.message.clone());
                Err(fault.into())
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn env_dir(&self) -> Option<&Path> {
        self.env_dir.as_deref()
    }

    pub fn has_environment(&self) -> bool {
        self.env_dir.is_some()
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    /// Status of the last engine call
    pub fn last_status(&self) -> &Status {
        &self.status
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(id = self.id, error = %e, "connection close failed");
        }
    }
}
