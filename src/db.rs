use sqlx::SqlitePool;

/// Categories inserted by [`seed_categories`].
pub const DEFAULT_CATEGORIES: [(&str, &str); 2] = [("Electronics", "Color: Black"), ("Clothing", "Size: M")];

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    // Cascade from users to ads depends on this
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            extra_property TEXT NOT NULL DEFAULT ''
        )"#,
    )
    .execute(pool)
    .await?;

    // Deleting a user removes their ads here; their image files are left on disk.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS ads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            title TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 200),
            description TEXT NOT NULL CHECK (length(description) >= 1),
            price REAL NOT NULL CHECK (price >= 0),
            image_filename TEXT NOT NULL DEFAULT '',
            is_enabled BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES categories(id)
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_ads_created", "CREATE INDEX IF NOT EXISTS idx_ads_created ON ads(created_at DESC)"),
        ("idx_ads_user", "CREATE INDEX IF NOT EXISTS idx_ads_user ON ads(user_id)"),
        ("idx_ads_category", "CREATE INDEX IF NOT EXISTS idx_ads_category ON ads(category_id)"),
    ];
    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }

    Ok(())
}

/// Inserts [`DEFAULT_CATEGORIES`], skipping names that already exist.
pub async fn seed_categories(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for (name, extra) in DEFAULT_CATEGORIES {
        let res = sqlx::query("INSERT INTO categories (name, extra_property) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .bind(extra)
            .execute(pool)
            .await?;
        inserted += res.rows_affected();
    }
    Ok(inserted)
}
