//! Cache statistics

use serde::{Deserialize, Serialize};

/// Counters kept by a [`TrackCache`](super::TrackCache) since creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub evictions: u64,
    /// Store operations that failed and were ignored.
    pub failures: u64,
    /// Bodies not cached because they exceeded `max_entry_bytes`.
    pub oversized_skipped: u64,
}

impl CacheStats {
    /// Hit rate (0.0 to 1.0) over all lookups.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}
