//! Cache configuration

use serde::{Deserialize, Serialize};

/// Configuration for the offline track cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Master switch; a disabled cache never reads or writes the store.
    pub enabled: bool,

    /// Maximum number of cached tracks; the oldest are evicted first (default: 64).
    pub max_entries: usize,

    /// Bodies larger than this are not cached (default: 32 MB, about 90 minutes).
    pub max_entry_bytes: u64,

    /// Chunk size used when replaying a cached body through the decoder (default: 16 KB).
    pub cached_chunk_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 64,
            max_entry_bytes: 32 * 1024 * 1024,
            cached_chunk_bytes: 16 * 1024,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_entry_bytes(mut self, bytes: u64) -> Self {
        self.max_entry_bytes = bytes;
        self
    }

    pub fn with_cached_chunk_bytes(mut self, bytes: usize) -> Self {
        self.cached_chunk_bytes = bytes;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == 0 {
            return Err("max_entries must be greater than 0".to_string());
        }

        if self.max_entry_bytes == 0 {
            return Err("max_entry_bytes must be greater than 0".to_string());
        }

        if self.cached_chunk_bytes == 0 {
            return Err("cached_chunk_bytes must be greater than 0".to_string());
        }

        Ok(())
    }
}
