//! Disk Environment
//!
//! Home directory shared by stores that want write-ahead logging.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::status;

use super::{EngineFault, EngineResult, Environment};

/// Environment of the bundled disk engine
///
/// Stores opened inside it keep their logs in `home` (see `log_path` for
/// the naming) and resolve relative store paths against it.
pub struct DiskEnvironment {
    home: PathBuf,
    closed: bool,
}

impl DiskEnvironment {
    /// Create the home directory if needed and take it as the environment
    pub fn open(home: &Path) -> EngineResult<Self> {
        fs::create_dir_all(home)?;
        if !fs::metadata(home)?.is_dir() {
            return Err(EngineFault::new(
                status::ENOTDIR,
                format!("{} is not a directory", home.display()),
            ));
        }

        tracing::debug!(home = %home.display(), "environment opened");
        Ok(Self {
            home: home.to_path_buf(),
            closed: false,
        })
    }
}

/// Path of the log belonging to the store file at `store_path`
///
/// A store under `home` is named by its path relative to `home`, with `%` and
/// separators escaped: `a.db` logs to `a.db.log`, `sub/a.db` to
/// `sub%2Fa.db.log`. A store outside `home` gets its file name plus a CRC32
/// of its canonical path, so `d1/a.db` and `d2/a.db` never share a log.
///
/// The store file must already exist.
pub(super) fn log_path(home: &Path, store_path: &Path) -> io::Result<PathBuf> {
    let canonical_home = home.canonicalize()?;
    let store = store_path.canonicalize()?;

    let name = match store.strip_prefix(&canonical_home) {
        Ok(relative) => escape(relative),
        Err(_) => {
            let file_name = store.file_name().map(Path::new).unwrap_or(store.as_path());
            let hash = crc32fast::hash(store.to_string_lossy().as_bytes());
            format!("{}.{:08x}", escape(file_name), hash)
        }
    };
    Ok(home.join(format!("{}.log", name)))
}

fn escape(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '/' | '\\' => escaped.push_str("%2F"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl Environment for DiskEnvironment {
    fn home(&self) -> &Path {
        &self.home
    }

    fn close(&mut self) -> EngineResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Make log creations and truncations durable
        #[cfg(unix)]
        fs::File::open(&self.home)?.sync_all()?;

        tracing::debug!(home = %self.home.display(), "environment closed");
        Ok(())
    }
}

impl Drop for DiskEnvironment {
    fn drop(&mut self) {
        if let Err(e) = Environment::close(self) {
            tracing::warn!(home = %self.home.display(), error = %e, "environment close failed");
        }
    }
}
