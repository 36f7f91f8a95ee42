//! Install and fetch statistics types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Summary of a completed install.
#[derive(Debug, Clone)]
pub struct InstallStats {
    /// Number of resources fetched and stored.
    pub resources_cached: usize,
    /// Total body bytes stored.
    pub total_bytes: u64,
    /// Wall time for the whole install.
    pub elapsed: Duration,
}

impl InstallStats {
    /// Average transfer speed in bytes per second.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.total_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

/// Point-in-time snapshot of fetch-path counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Requests answered from the store with no network traffic.
    pub cache_hits: u64,
    /// Live network fetches performed.
    pub network_fetches: u64,
    /// Requests answered with the offline fallback.
    pub offline_served: u64,
}

impl FetchStats {
    /// Total requests resolved.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.cache_hits + self.network_fetches + self.offline_served
    }

    /// Fraction of requests answered from the store, 0.0 when idle.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// Shared counters updated on every resolved request.
#[derive(Debug, Default)]
pub struct FetchCounters {
    cache_hits: AtomicU64,
    network_fetches: AtomicU64,
    offline_served: AtomicU64,
}

impl FetchCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            network_fetches: AtomicU64::new(0),
            offline_served: AtomicU64::new(0),
        }
    }

    /// Records a request served from the store.
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a live network fetch.
    pub fn record_network(&self) {
        self.network_fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request answered with the offline fallback.
    pub fn record_offline(&self) {
        self.offline_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshots the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> FetchStats {
        FetchStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            offline_served: self.offline_served.load(Ordering::Relaxed),
        }
    }
}
