//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use bytes::Buf;

use crate::error::Result;

use super::{WalEntry, HEADER_SIZE};

/// Reads entries from the WAL file
///
/// A torn tail (partial header or partial data) ends the log quietly;
/// a complete entry with a bad checksum is reported as corruption.
pub struct WalReader {
    file: BufReader<File>,
    /// Offset just past the last complete entry
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        if !read_full(&mut self.file, &mut header)? {
            return Ok(None);
        }

        let mut len_field = &header[12..16];
        let len = len_field.get_u32_le() as usize;

        let mut buffer = vec![0u8; HEADER_SIZE + len];
        buffer[..HEADER_SIZE].copy_from_slice(&header);
        if !read_full(&mut self.file, &mut buffer[HEADER_SIZE..])? {
            return Ok(None);
        }

        let entry = WalEntry::deserialize(&buffer)?;
        self.position += buffer.len() as u64;
        Ok(Some(entry))
    }

    /// Offset just past the last entry returned
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Fill `buf` completely. Returns false on EOF before the buffer is full.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
