//! Snapshot Reader
//!
//! Loads and verifies a store file.

use std::fs;
use std::path::Path;

use bytes::Buf;

use crate::error::{KvError, Result};
use crate::memtable::Entry;
use crate::status;

use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Reader for store files
pub struct SnapshotReader {
    entries: Vec<Entry>,
    file_size: u64,
}

impl SnapshotReader {
    /// Read the whole file and verify header, footer and data checksum
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let file_size = bytes.len() as u64;

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(bad_format(format!(
                "{}: file of {} bytes is too short to be a store",
                path.display(),
                file_size
            )));
        }

        let mut header = &bytes[..HEADER_SIZE as usize];
        if &header[0..4] != MAGIC {
            return Err(bad_format(format!(
                "{}: invalid magic {:?}",
                path.display(),
                &header[0..4]
            )));
        }
        header.advance(4);

        let version = header.get_u16_le();
        if version != VERSION {
            return Err(bad_format(format!(
                "{}: unsupported format version {}",
                path.display(),
                version
            )));
        }
        let entry_count = header.get_u64_le();

        let mut footer = &bytes[(file_size - FOOTER_SIZE) as usize..];
        let data_end = footer.get_u64_le();
        let data_crc = footer.get_u32_le();

        if data_end != file_size - FOOTER_SIZE {
            return Err(corrupt(format!(
                "{}: footer points at offset {}, data ends at {}",
                path.display(),
                data_end,
                file_size - FOOTER_SIZE
            )));
        }

        let data = &bytes[HEADER_SIZE as usize..data_end as usize];
        if crc32fast::hash(data) != data_crc {
            return Err(corrupt(format!("{}: data checksum mismatch", path.display())));
        }

        let entries = parse_entries(data, entry_count)
            .ok_or_else(|| corrupt(format!("{}: malformed data block", path.display())))?;

        Ok(Self { entries, file_size })
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

fn parse_entries(mut data: &[u8], expected: u64) -> Option<Vec<Entry>> {
    let mut entries = Vec::new();
    while data.has_remaining() {
        if data.remaining() < 8 {
            return None;
        }
        let key_len = data.get_u32_le() as usize;
        let val_len = data.get_u32_le() as usize;
        if data.remaining() < key_len + val_len {
            return None;
        }
        let key = data[..key_len].to_vec();
        data.advance(key_len);
        let value = data[..val_len].to_vec();
        data.advance(val_len);
        entries.push((key, value));
    }
    (entries.len() as u64 == expected).then_some(entries)
}

fn bad_format(message: String) -> KvError {
    KvError::Store {
        code: status::BAD_FORMAT,
        message,
    }
}

fn corrupt(message: String) -> KvError {
    KvError::Store {
        code: status::CORRUPT,
        message,
    }
}
