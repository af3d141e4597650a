//! Tests for the Adboard backend.
//!
//! - **api_tests**: router-level tests, including the image upload protocol and timeouts
//! - **ad_repository_tests**: ad persistence workflow against in-memory SQLite
//! - **user_repository_tests**: user creation, uniqueness and cascading delete
//! - **db_tests**: schema bootstrap and seeding
//! - **storage_tests**: image store and filename rules
//! - **error_tests**: error classification and HTTP mapping
//! - **config_tests**: configuration defaults, layering and validation
//! - **auth_tests**: shared-secret middleware

mod ad_repository_tests;
mod storage_tests;

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::{config::AppConfig, db, state::AppState};

pub(crate) const TEST_KEY: &str = "test-secret";

/// App state over an in-memory database and a temporary image directory.
/// Keep the value alive for the duration of the test; dropping it removes the directory.
pub(crate) struct TestEnv {
    pub state: AppState,
    pub images_dir: TempDir,
}

impl TestEnv {
    pub fn pool(&self) -> &SqlitePool {
        &self.state.db
    }

    pub fn image_count(&self) -> usize {
        count_files(self.images_dir.path())
    }

    pub fn image_exists(&self, filename: &str) -> bool {
        self.images_dir.path().join(filename).is_file()
    }

    /// Waits up to two seconds for background cleanup to settle on `expected` files.
    pub async fn settle_image_count(&self, expected: usize) -> usize {
        for _ in 0..100 {
            if self.image_count() == expected {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        self.image_count()
    }
}

pub(crate) async fn mk_env() -> TestEnv {
    mk_env_with(|_| {}).await
}

/// Like [`mk_env`], letting the test adjust the configuration first.
pub(crate) async fn mk_env_with(adjust: impl FnOnce(&mut AppConfig)) -> TestEnv {
    let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
    db::init_db(&pool).await.unwrap();

    let images_dir = tempfile::tempdir().unwrap();
    let mut cfg = AppConfig::default();
    cfg.storage.images_dir = images_dir.path().display().to_string();
    cfg.auth.api_key = TEST_KEY.to_string();
    adjust(&mut cfg);

    TestEnv { state: AppState::new(pool, cfg), images_dir }
}

pub(crate) async fn insert_user(pool: &SqlitePool, name: &str, email: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO users (name, email) VALUES (?1, ?2) RETURNING id")
        .bind(name)
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub(crate) async fn insert_category(pool: &SqlitePool, name: &str, extra: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO categories (name, extra_property) VALUES (?1, ?2) RETURNING id")
        .bind(name)
        .bind(extra)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub(crate) async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table)).fetch_one(pool).await.unwrap()
}

pub(crate) fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.filter_map(Result::ok).count()).unwrap_or(0)
}

/// Smallest JPEG-looking payload; the store never decodes images.
pub(crate) const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9];
