use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Request counters for monitoring
#[derive(Clone)]
pub struct Metrics {
    pub searches: Arc<AtomicU64>,
    pub nearby_searches: Arc<AtomicU64>,
    pub locations_created: Arc<AtomicU64>,
    pub locations_updated: Arc<AtomicU64>,
    pub locations_deleted: Arc<AtomicU64>,
    pub store_errors: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            searches: Arc::new(AtomicU64::new(0)),
            nearby_searches: Arc::new(AtomicU64::new(0)),
            locations_created: Arc::new(AtomicU64::new(0)),
            locations_updated: Arc::new(AtomicU64::new(0)),
            locations_deleted: Arc::new(AtomicU64::new(0)),
            store_errors: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_searches(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_nearby_searches(&self) {
        self.nearby_searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_created(&self) {
        self.locations_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_updated(&self) {
        self.locations_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_deleted(&self) {
        self.locations_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_store_errors(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            searches: self.searches.load(Ordering::Relaxed),
            nearby_searches: self.nearby_searches.load(Ordering::Relaxed),
            locations_created: self.locations_created.load(Ordering::Relaxed),
            locations_updated: self.locations_updated.load(Ordering::Relaxed),
            locations_deleted: self.locations_deleted.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub searches: u64,
    pub nearby_searches: u64,
    pub locations_created: u64,
    pub locations_updated: u64,
    pub locations_deleted: u64,
    pub store_errors: u64,
    pub uptime_seconds: u64,
}
