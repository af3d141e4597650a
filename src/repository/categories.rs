use sqlx::SqlitePool;

use crate::db;
use crate::error::RepoResult;
use crate::types::Category;

/// Read access to categories. Ads reference them; this service never edits them.
#[derive(Clone)]
pub struct CategoryRepository {
    db: SqlitePool,
}

impl CategoryRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> RepoResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name, extra_property FROM categories ORDER BY id")
                .fetch_all(&self.db)
                .await?;
        Ok(categories)
    }

    /// Inserts the default categories; returns how many were new.
    pub async fn seed_defaults(&self) -> RepoResult<u64> {
        Ok(db::seed_categories(&self.db).await?)
    }
}
