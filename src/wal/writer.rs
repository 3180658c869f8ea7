//! WAL Writer
//!
//! Handles appending entries to the WAL file.
//!
//! An append either lands completely or not at all: if the write, flush or
//! fsync fails, the file is cut back to its length before the append and the
//! LSN is not consumed. A write reported as failed is never replayed later.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::config::WalSyncStrategy;
use crate::error::Result;

use super::{Operation, WalEntry, WalRecovery};

/// File operations the writer needs beyond `Write`
pub trait LogFile: Write {
    /// Current length in bytes
    fn byte_len(&self) -> io::Result<u64>;

    /// Cut or extend the file to `len` bytes
    fn set_len(&self, len: u64) -> io::Result<()>;

    /// Flush written data (and the length) to stable storage
    fn sync_data(&self) -> io::Result<()>;
}

impl LogFile for File {
    fn byte_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync_data(&self) -> io::Result<()> {
        File::sync_data(self)
    }
}

/// Writes entries to the WAL file
///
/// Entries are written whole with a single `write_all`, so there is no
/// user-space buffer that could carry a failed entry into a later append.
pub struct WalWriter<F: LogFile = File> {
    file: F,
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries appended since the last fsync
    unsynced: usize,
}

impl WalWriter<File> {
    /// Open or create a WAL file, continuing after its last valid LSN
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let last_lsn = WalRecovery::verify(path)?.last_lsn;
        Ok(Self::with_file(file, last_lsn, sync_strategy))
    }
}

impl<F: LogFile> WalWriter<F> {
    /// Write to an already open log whose last entry has `last_lsn`
    ///
    /// The file must append: every write goes to its current end.
    pub fn with_file(file: F, last_lsn: u64, sync_strategy: WalSyncStrategy) -> Self {
        Self {
            file,
            current_lsn: last_lsn,
            sync_strategy,
            unsynced: 0,
        }
    }

    /// Append an operation to the WAL. Returns its LSN.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let entry = WalEntry::new(self.current_lsn + 1, operation);
        let bytes = entry.serialize()?;
        let start = self.file.byte_len()?;

        if let Err(e) = self.write_entry(&bytes) {
            self.rollback(start);
            return Err(e);
        }

        self.current_lsn = entry.lsn;
        Ok(entry.lsn)
    }

    fn write_entry(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes)?;
        let pending = self.unsynced + 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => pending >= count,
        };
        if due {
            self.sync()
        } else {
            self.file.flush()?;
            self.unsynced = pending;
            Ok(())
        }
    }

    /// Cut the file back to `len` after a failed append
    fn rollback(&mut self, len: u64) {
        let result = self
            .file
            .set_len(len)
            .and_then(|()| self.file.sync_data());
        if let Err(e) = result {
            tracing::error!(error = %e, len, "could not roll back failed WAL append");
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every entry (after a checkpoint). LSNs keep increasing.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.set_len(0)?;
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the current LSN
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// The underlying file
    pub fn file(&self) -> &F {
        &self.file
    }
}
