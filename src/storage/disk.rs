//! Disk Engine
//!
//! The bundled ordered key-value engine.
//!
//! ## Responsibilities
//! - Load the store file into a MemTable on open (creating it if missing)
//! - Inside an environment: log every write, recover the log on open
//! - Write the table back to the store file on sync, compact and close
//! - Hand out cursors that only weakly reference the table

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use crate::codec::Record;
use crate::config::Config;
use crate::memtable::MemTable;
use crate::status;
use crate::wal::{Operation, WalRecovery, WalWriter};

use super::env::{log_path, DiskEnvironment};
use super::snapshot::{self, SnapshotBuilder, SnapshotReader};
use super::{Engine, EngineCursor, EngineFault, EngineResult, Environment, Store, StoreStat};

/// Re-padding byte reported for fixed-length records (ASCII space)
const FIXED_RECORD_PAD: u32 = 0x20;

/// Factory for disk stores and environments
#[derive(Debug, Clone, Default)]
pub struct DiskEngine {
    config: Config,
}

impl DiskEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Engine for DiskEngine {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn open_environment(&self, home: &Path) -> EngineResult<Box<dyn Environment>> {
        Ok(Box::new(DiskEnvironment::open(home)?))
    }

    fn open_store(
        &self,
        path: &Path,
        env: Option<&dyn Environment>,
    ) -> EngineResult<Box<dyn Store>> {
        Ok(Box::new(DiskStore::open(path, env, &self.config)?))
    }
}

// =============================================================================
// Store
// =============================================================================

/// One open store file
pub struct DiskStore {
    /// Resolved store file path
    path: PathBuf,

    /// Live records; cursors hold a Weak to this
    table: Arc<MemTable>,

    /// Auto-commit log, present when opened inside an environment
    wal: Option<WalWriter>,

    /// Table differs from the store file
    dirty: bool,

    closed: bool,

    page_size: u32,
    min_keys_per_page: u32,
}

impl DiskStore {
    /// Open or create a store
    ///
    /// On open:
    /// 1. Resolve a relative path against the environment home
    /// 2. Create an empty store file if none exists
    /// 3. Load and verify the store file
    /// 4. Replay the environment log, checkpoint, and truncate it
    pub fn open(
        path: &Path,
        env: Option<&dyn Environment>,
        config: &Config,
    ) -> EngineResult<Self> {
        let path = match env {
            Some(env) if path.is_relative() => env.home().join(path),
            _ => path.to_path_buf(),
        };

        if !path.exists() {
            SnapshotBuilder::new(&path)?.finish()?;
            tracing::debug!(path = %path.display(), "created store file");
        }

        let reader = SnapshotReader::open(&path)?;
        let table = Arc::new(MemTable::from_entries(reader.into_entries()));

        let mut store = Self {
            path,
            table,
            wal: None,
            dirty: false,
            closed: false,
            page_size: config.page_size,
            min_keys_per_page: config.min_keys_per_page,
        };

        if let Some(env) = env {
            let log = log_path(env.home(), &store.path)?;
            if log.exists() {
                store.replay(&log)?;
            }
            let mut wal = WalWriter::open(&log, config.wal_sync_strategy)?;
            if store.dirty {
                store.write_snapshot()?;
                wal.truncate()?;
            }
            store.wal = Some(wal);
        }

        Ok(store)
    }

    /// Apply the recoverable prefix of a log to the table
    fn replay(&mut self, log: &Path) -> EngineResult<()> {
        let (entries, result) = WalRecovery::recover(log)?;

        for entry in entries {
            match entry.operation {
                Operation::Put { key, value } => {
                    self.table.put(key, value);
                }
                Operation::Delete { key } => {
                    self.table.delete(&key);
                }
            }
            self.dirty = true;
        }

        if result.entries_recovered > 0 || result.entries_corrupted > 0 {
            tracing::info!(
                path = %self.path.display(),
                recovered = result.entries_recovered,
                corrupted = result.entries_corrupted,
                last_lsn = result.last_lsn,
                "WAL recovery"
            );
        }
        Ok(())
    }

    /// Write the table to the store file
    fn write_snapshot(&mut self) -> EngineResult<u64> {
        let mut builder = SnapshotBuilder::new(&self.path)?;
        for (key, value) in self.table.entries() {
            builder.add(&key, &value)?;
        }
        let info = builder.finish()?;
        self.dirty = false;
        Ok(info.file_size)
    }

    /// Snapshot if needed and drop logged entries now covered by it
    fn checkpoint(&mut self) -> EngineResult<()> {
        if self.dirty {
            self.write_snapshot()?;
        }
        if let Some(wal) = self.wal.as_mut() {
            wal.truncate()?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed {
            return Err(EngineFault::closed("store"));
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for DiskStore {
    fn get(&self, record: &mut Record) -> EngineResult<bool> {
        self.ensure_open()?;
        match self.table.get(record.key()) {
            Some(value) => {
                record.fill_value(&value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn put(&mut self, record: &Record) -> EngineResult<()> {
        self.ensure_open()?;
        if let Some(wal) = self.wal.as_mut() {
            wal.append(Operation::Put {
                key: record.key().to_vec(),
                value: record.value().to_vec(),
            })?;
        }
        self.table.put(record.key().to_vec(), record.value().to_vec());
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, record: &Record) -> EngineResult<bool> {
        self.ensure_open()?;
        if !self.table.contains(record.key()) {
            return Ok(false);
        }
        if let Some(wal) = self.wal.as_mut() {
            wal.append(Operation::Delete {
                key: record.key().to_vec(),
            })?;
        }
        self.table.delete(record.key());
        self.dirty = true;
        Ok(true)
    }

    fn exists(&self, record: &Record) -> EngineResult<bool> {
        self.ensure_open()?;
        Ok(self.table.contains(record.key()))
    }

    fn stat(&self) -> EngineResult<StoreStat> {
        self.ensure_open()?;
        let count = self.table.entry_count() as u64;
        let data_pages = (self.table.size() as u64).div_ceil(self.page_size as u64);

        Ok(StoreStat {
            magic: snapshot::magic_number(),
            min_keys_per_page: self.min_keys_per_page,
            record_count: count,
            key_count: count,
            page_count: 1 + data_pages,
            page_size: self.page_size,
            fixed_record_len: 0,
            fixed_record_pad: FIXED_RECORD_PAD,
            version: snapshot::VERSION as u32,
        })
    }

    fn compact(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        let before = std::fs::metadata(&self.path)?.len();
        let after = self.write_snapshot()?;
        if let Some(wal) = self.wal.as_mut() {
            wal.truncate()?;
        }
        tracing::info!(
            path = %self.path.display(),
            bytes_before = before,
            bytes_after = after,
            "compacted store"
        );
        Ok(())
    }

    fn sync(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        self.checkpoint()
    }

    fn cursor(&self) -> EngineResult<Box<dyn EngineCursor>> {
        self.ensure_open()?;
        Ok(Box::new(DiskCursor::new(Arc::downgrade(&self.table))))
    }

    fn close(&mut self) -> EngineResult<()> {
        if self.closed {
            return Ok(());
        }
        self.checkpoint()?;
        if let Some(wal) = self.wal.as_mut() {
            wal.sync()?;
        }
        self.closed = true;
        tracing::debug!(path = %self.path.display(), "store closed");
        Ok(())
    }
}

impl Drop for DiskStore {
    fn drop(&mut self) {
        if let Err(e) = Store::close(self) {
            tracing::warn!(path = %self.path.display(), error = %e, "store close failed");
        }
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Cursor over a disk store
///
/// Remembers the key it last returned and re-seeks from it on every step,
/// so writes to the store between steps are safe.
pub struct DiskCursor {
    table: Weak<MemTable>,
    /// Key of the last fetched record; None while unpositioned
    position: Option<Vec<u8>>,
    closed: bool,
}

impl DiskCursor {
    fn new(table: Weak<MemTable>) -> Self {
        Self {
            table,
            position: None,
            closed: false,
        }
    }

    fn table(&self) -> EngineResult<Arc<MemTable>> {
        if self.closed {
            return Err(EngineFault::closed("cursor"));
        }
        self.table
            .upgrade()
            .ok_or_else(|| EngineFault::new(status::CLOSED, "store behind cursor has been closed"))
    }

    fn step(&mut self, record: &mut Record, forward: bool) -> EngineResult<bool> {
        let table = self.table()?;
        let position = self.position.as_deref();
        let found = if forward {
            table.next_after(position)
        } else {
            table.prev_before(position)
        };

        match found {
            Some((key, value)) => {
                record.fill(&key, &value);
                self.position = Some(key);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl EngineCursor for DiskCursor {
    fn next(&mut self, record: &mut Record) -> EngineResult<bool> {
        self.step(record, true)
    }

    fn prev(&mut self, record: &mut Record) -> EngineResult<bool> {
        self.step(record, false)
    }

    fn close(&mut self) -> EngineResult<()> {
        self.closed = true;
        self.table = Weak::new();
        Ok(())
    }
}
