use sqlx::SqlitePool;

use super::exists;
use crate::error::{Entity, RepoError, RepoResult};
use crate::metrics::Metrics;
use crate::types::{User, UserCreate};

#[derive(Clone)]
pub struct UserRepository {
    db: SqlitePool,
    metrics: Metrics,
}

impl UserRepository {
    pub fn new(db: SqlitePool, metrics: Metrics) -> Self {
        Self { db, metrics }
    }

    /// Inserts a user. Name and email are expected to be validated by the caller.
    pub async fn create(&self, user: &UserCreate) -> RepoResult<User> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email) VALUES (?1, ?2) RETURNING id, name, email, created_at",
        )
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate { field: "email" }
            }
            other => RepoError::Storage(other),
        })?;

        self.metrics.inc_users_created();
        tracing::info!(user_id = created.id, "user created");
        Ok(created)
    }

    pub async fn fetch_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, email, created_at FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// Deletes a user. Their ads go with them through `ON DELETE CASCADE`; the ads'
    /// image files are not removed.
    pub async fn delete(&self, id: i64) -> RepoResult<()> {
        let mut tx = self.db.begin().await?;
        if !exists(&mut *tx, "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)", id).await? {
            return Err(RepoError::NotFound { entity: Entity::User, id });
        }
        sqlx::query("DELETE FROM users WHERE id = ?1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;

        self.metrics.inc_users_deleted();
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }
}
