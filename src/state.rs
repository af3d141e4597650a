use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::repository::{AdRepository, CategoryRepository, UserRepository};
use crate::storage::ImageStore;

/// The shared application state.
///
/// Cloned into every handler. The connection pool is the only shared mutable resource;
/// everything else is configuration, counters, or a path.
#[derive(Clone)]
pub struct AppState {
    /// The SQLite connection pool.
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Flat directory holding ad images.
    pub images: ImageStore,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let metrics = Metrics::new();
        let images = ImageStore::new(&config.storage.images_dir, metrics.clone());
        Self { db, config: Arc::new(config), metrics, images }
    }

    pub fn ads(&self) -> AdRepository {
        AdRepository::new(self.db.clone(), self.images.clone(), self.metrics.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.db.clone(), self.metrics.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.db.clone())
    }
}
