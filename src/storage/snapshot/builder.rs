//! Snapshot Builder
//!
//! Assembles a store file in memory and swaps it in atomically.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

use crate::error::{KvError, Result};

use super::{SnapshotInfo, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Builder for store files
///
/// Entries are buffered until `finish()`, which writes `<path>.tmp`, syncs
/// it and renames it over `path`. Dropping an unfinished builder leaves the
/// existing file untouched.
pub struct SnapshotBuilder {
    path: PathBuf,
    /// Encoded data block
    data: BytesMut,
    entry_count: u64,
}

impl SnapshotBuilder {
    /// Start a store file at `path`; call `add()` in key order, then `finish()`
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            data: BytesMut::new(),
            entry_count: 0,
        })
    }

    /// Append one pair to the data block
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.reserve(8 + key.len() + value.len());
        self.data.put_u32_le(length_field(key.len())?);
        self.data.put_u32_le(length_field(value.len())?);
        self.data.put_slice(key);
        self.data.put_slice(value);
        self.entry_count += 1;
        Ok(())
    }

    /// Write header, data and footer, then replace the store file
    pub fn finish(self) -> Result<SnapshotInfo> {
        let data_end = HEADER_SIZE + self.data.len() as u64;

        let mut file_bytes = BytesMut::with_capacity((data_end + FOOTER_SIZE) as usize);
        file_bytes.put_slice(MAGIC);
        file_bytes.put_u16_le(VERSION);
        file_bytes.put_u64_le(self.entry_count);
        file_bytes.put_slice(&self.data);
        file_bytes.put_u64_le(data_end);
        file_bytes.put_u32_le(crc32fast::hash(&self.data));
        file_bytes.put_u32_le(0);

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = File::create(&tmp_path)?;
        file.write_all(&file_bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, &self.path)?;

        tracing::trace!(
            path = %self.path.display(),
            entries = self.entry_count,
            bytes = file_bytes.len(),
            "store file written"
        );

        Ok(SnapshotInfo {
            path: self.path,
            entry_count: self.entry_count,
            file_size: file_bytes.len() as u64,
        })
    }
}

fn length_field(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| KvError::Codec(format!("record field of {} bytes is too large", len)))
}
