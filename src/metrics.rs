use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Operational counters
#[derive(Clone)]
pub struct Metrics {
    pub ads_created: Arc<AtomicU64>,
    pub ads_updated: Arc<AtomicU64>,
    pub ads_deleted: Arc<AtomicU64>,
    pub users_created: Arc<AtomicU64>,
    pub users_deleted: Arc<AtomicU64>,
    pub images_stored: Arc<AtomicU64>,
    pub images_removed: Arc<AtomicU64>,
    /// Best-effort image deletions that failed; each one is a potential orphaned file.
    pub image_cleanup_failures: Arc<AtomicU64>,
    /// Stored images whose request ended before the referencing row was committed.
    pub uploads_abandoned: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            ads_created: Arc::new(AtomicU64::new(0)),
            ads_updated: Arc::new(AtomicU64::new(0)),
            ads_deleted: Arc::new(AtomicU64::new(0)),
            users_created: Arc::new(AtomicU64::new(0)),
            users_deleted: Arc::new(AtomicU64::new(0)),
            images_stored: Arc::new(AtomicU64::new(0)),
            images_removed: Arc::new(AtomicU64::new(0)),
            image_cleanup_failures: Arc::new(AtomicU64::new(0)),
            uploads_abandoned: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_ads_created(&self) {
        self.ads_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ads_updated(&self) {
        self.ads_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ads_deleted(&self) {
        self.ads_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_users_created(&self) {
        self.users_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_users_deleted(&self) {
        self.users_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_images_stored(&self) {
        self.images_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_images_removed(&self) {
        self.images_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_image_cleanup_failures(&self) {
        self.image_cleanup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_uploads_abandoned(&self) {
        self.uploads_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ads_created: self.ads_created.load(Ordering::Relaxed),
            ads_updated: self.ads_updated.load(Ordering::Relaxed),
            ads_deleted: self.ads_deleted.load(Ordering::Relaxed),
            users_created: self.users_created.load(Ordering::Relaxed),
            users_deleted: self.users_deleted.load(Ordering::Relaxed),
            images_stored: self.images_stored.load(Ordering::Relaxed),
            images_removed: self.images_removed.load(Ordering::Relaxed),
            image_cleanup_failures: self.image_cleanup_failures.load(Ordering::Relaxed),
            uploads_abandoned: self.uploads_abandoned.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MetricsSnapshot {
    pub ads_created: u64,
    pub ads_updated: u64,
    pub ads_deleted: u64,
    pub users_created: u64,
    pub users_deleted: u64,
    pub images_stored: u64,
    pub images_removed: u64,
    pub image_cleanup_failures: u64,
    pub uploads_abandoned: u64,
    pub uptime_seconds: u64,
}
