use sqlx::{sqlite::SqliteRow, Row, SqliteExecutor, SqlitePool};

use super::exists;
use crate::error::{Entity, RepoError, RepoResult};
use crate::metrics::Metrics;
use crate::storage::ImageStore;
use crate::types::{Ad, AdCreate, AdUpdate, Category, User};

// Joined projection shared by every read path
macro_rules! ad_select {
    () => {
        r#"SELECT a.id AS ad_id, a.title, a.description, a.price, a.image_filename,
                  a.is_enabled, a.created_at AS ad_created_at,
                  u.id AS user_id, u.name AS user_name, u.email AS user_email, u.created_at AS user_created_at,
                  c.id AS category_id, c.name AS category_name, c.extra_property AS category_extra_property
           FROM ads a
           JOIN users u ON a.user_id = u.id
           JOIN categories c ON a.category_id = c.id"#
    };
}

fn ad_from_row(row: &SqliteRow) -> Result<Ad, sqlx::Error> {
    Ok(Ad {
        id: row.try_get("ad_id")?,
        user: User {
            id: row.try_get("user_id")?,
            name: row.try_get("user_name")?,
            email: row.try_get("user_email")?,
            created_at: row.try_get("user_created_at")?,
        },
        category: Category {
            id: row.try_get("category_id")?,
            name: row.try_get("category_name")?,
            extra_property: row.try_get("category_extra_property")?,
        },
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image: row.try_get("image_filename")?,
        is_enabled: row.try_get("is_enabled")?,
        created_at: row.try_get("ad_created_at")?,
    })
}

async fn fetch_joined<'e, E>(exec: E, id: i64) -> Result<Option<Ad>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(concat!(ad_select!(), " WHERE a.id = ?1")).bind(id).fetch_optional(exec).await?;
    row.as_ref().map(ad_from_row).transpose()
}

/// Ad lifecycle: joined reads, transactional writes, and the image-file side effects
/// that belong to an ad's own update and delete.
#[derive(Clone)]
pub struct AdRepository {
    db: SqlitePool,
    images: ImageStore,
    metrics: Metrics,
}

impl AdRepository {
    pub fn new(db: SqlitePool, images: ImageStore, metrics: Metrics) -> Self {
        Self { db, images, metrics }
    }

    /// `Ok(None)` when no ad has this id.
    pub async fn fetch_by_id(&self, id: i64) -> RepoResult<Option<Ad>> {
        Ok(fetch_joined(&self.db, id).await?)
    }

    /// All ads, newest first.
    pub async fn fetch_all(&self) -> RepoResult<Vec<Ad>> {
        let rows = sqlx::query(concat!(ad_select!(), " ORDER BY a.created_at DESC, a.id DESC"))
            .fetch_all(&self.db)
            .await?;
        let ads = rows.iter().map(ad_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(ads)
    }

    /// Inserts an ad referencing `image_filename`, enabled by default.
    ///
    /// User and category are checked inside the same transaction as the insert, so a
    /// missing reference is reported by entity and nothing is written.
    pub async fn create(&self, cmd: &AdCreate, image_filename: &str) -> RepoResult<Ad> {
        let mut tx = self.db.begin().await?;

        if !exists(&mut *tx, "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)", cmd.user_id).await? {
            return Err(RepoError::MissingReference { entity: Entity::User, id: cmd.user_id });
        }
        if !exists(&mut *tx, "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)", cmd.category_id).await? {
            return Err(RepoError::MissingReference { entity: Entity::Category, id: cmd.category_id });
        }

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO ads (user_id, category_id, title, description, price, image_filename, is_enabled)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
               RETURNING id"#,
        )
        .bind(cmd.user_id)
        .bind(cmd.category_id)
        .bind(&cmd.title)
        .bind(&cmd.description)
        .bind(cmd.price)
        .bind(image_filename)
        .fetch_one(&mut *tx)
        .await?;

        let ad = fetch_joined(&mut *tx, id).await?.ok_or(RepoError::NotFound { entity: Entity::Ad, id })?;
        tx.commit().await?;

        self.metrics.inc_ads_created();
        tracing::info!(ad_id = id, user_id = cmd.user_id, category_id = cmd.category_id, "ad created");
        Ok(ad)
    }

    /// Updates the text fields, and the image reference when `new_image` is given.
    ///
    /// The previous image file is removed only after the new reference is committed;
    /// failing to remove it does not fail the update.
    pub async fn update(&self, id: i64, changes: &AdUpdate, new_image: Option<&str>) -> RepoResult<()> {
        self.update_then(id, changes, new_image, || {}).await
    }

    /// Like [`update`](Self::update), calling `on_commit` as soon as the transaction has
    /// committed and before any further await.
    pub async fn update_then<F>(
        &self,
        id: i64,
        changes: &AdUpdate,
        new_image: Option<&str>,
        on_commit: F,
    ) -> RepoResult<()>
    where
        F: FnOnce(),
    {
        let mut tx = self.db.begin().await?;

        let old_image: String = sqlx::query_scalar("SELECT image_filename FROM ads WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepoError::NotFound { entity: Entity::Ad, id })?;

        match new_image {
            None => {
                sqlx::query("UPDATE ads SET title = ?1, description = ?2, price = ?3 WHERE id = ?4")
                    .bind(&changes.title)
                    .bind(&changes.description)
                    .bind(changes.price)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            Some(image) => {
                sqlx::query(
                    "UPDATE ads SET title = ?1, description = ?2, price = ?3, image_filename = ?4 WHERE id = ?5",
                )
                .bind(&changes.title)
                .bind(&changes.description)
                .bind(changes.price)
                .bind(image)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        on_commit();
        self.metrics.inc_ads_updated();

        if let Some(image) = new_image {
            if old_image != image {
                self.remove_detached(old_image, "replaced by ad update").await;
            }
        }
        Ok(())
    }

    /// Current value of the enabled flag.
    pub async fn enabled_state(&self, id: i64) -> RepoResult<bool> {
        sqlx::query_scalar("SELECT is_enabled FROM ads WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(RepoError::NotFound { entity: Entity::Ad, id })
    }

    /// Sets the enabled flag. A plain set: calling it twice with the same value is a no-op.
    ///
    /// Also reports `NotFound` when no row has this id, so callers need not read the
    /// row first to detect a missing ad.
    pub async fn toggle(&self, id: i64, enabled: bool) -> RepoResult<()> {
        let res = sqlx::query("UPDATE ads SET is_enabled = ?1 WHERE id = ?2")
            .bind(enabled)
            .bind(id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound { entity: Entity::Ad, id });
        }
        Ok(())
    }

    /// Deletes the row, then its image file once the delete is committed.
    pub async fn delete(&self, id: i64) -> RepoResult<()> {
        let mut tx = self.db.begin().await?;

        let image: String = sqlx::query_scalar("SELECT image_filename FROM ads WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepoError::NotFound { entity: Entity::Ad, id })?;

        sqlx::query("DELETE FROM ads WHERE id = ?1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;

        self.metrics.inc_ads_deleted();
        tracing::info!(ad_id = id, "ad deleted");
        self.remove_detached(image, "ad deleted").await;
        Ok(())
    }

    /// Removes a committed row's file on its own task, so a caller dropped while
    /// waiting does not skip the cleanup.
    async fn remove_detached(&self, filename: String, reason: &'static str) {
        let images = self.images.clone();
        let task = tokio::spawn(async move { images.remove_best_effort(&filename, reason).await });
        if let Err(e) = task.await {
            self.metrics.inc_image_cleanup_failures();
            tracing::warn!(reason, error = %e, "image cleanup task failed");
        }
    }
}
