//! Configuration for handlekv
//!
//! Centralized configuration with sensible defaults.

use crate::error::{KvError, Result};

/// Smallest page size the bundled engine accepts
pub const MIN_PAGE_SIZE: u32 = 512;

/// Largest page size the bundled engine accepts
pub const MAX_PAGE_SIZE: u32 = 64 * 1024;

/// Main configuration for a [`Registry`](crate::Registry)
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// Compress encoded values before they reach the store.
    /// Keys are never compressed.
    pub compress_values: bool,

    /// zstd level used when `compress_values` is set
    pub compression_level: i32,

    // -------------------------------------------------------------------------
    // Engine Configuration
    // -------------------------------------------------------------------------
    /// Page size reported by `stat()` and used for the page-count estimate
    pub page_size: u32,

    /// Minimum keys per page reported by `stat()`
    pub min_keys_per_page: u32,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the log of a store opened
    /// inside an environment
    pub wal_sync_strategy: WalSyncStrategy,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compress_values: cfg!(feature = "compression"),
            compression_level: 3,
            page_size: 4096,
            min_keys_per_page: 2,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration can be honored by this build
    pub fn validate(&self) -> Result<()> {
        if !self.page_size.is_power_of_two()
            || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size)
        {
            return Err(KvError::Config(format!(
                "page size must be a power of two in {}..={}, got {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE, self.page_size
            )));
        }

        if self.min_keys_per_page < 2 {
            return Err(KvError::Config(format!(
                "min keys per page must be at least 2, got {}",
                self.min_keys_per_page
            )));
        }

        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(KvError::Config(
                "WAL sync interval must be at least one entry".to_string(),
            ));
        }

        if self.compress_values && !cfg!(feature = "compression") {
            return Err(KvError::Config(
                "value compression requested but the `compression` feature is disabled"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Enable or disable value compression
    pub fn compress_values(mut self, enabled: bool) -> Self {
        self.config.compress_values = enabled;
        self
    }

    /// Set the zstd compression level
    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Set the page size (in bytes)
    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the minimum keys per page
    pub fn min_keys_per_page(mut self, count: u32) -> Self {
        self.config.min_keys_per_page = count;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
