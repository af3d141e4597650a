//! Persistence workflows.
//!
//! Each repository owns one table's write paths and returns classified
//! [`RepoError`](crate::error::RepoError)s. Multi-statement operations run inside a
//! single sqlx transaction; a transaction dropped before `commit` (early return, error,
//! cancelled request) is rolled back.

pub mod ads;
pub mod categories;
pub mod users;

pub use ads::AdRepository;
pub use categories::CategoryRepository;
pub use users::UserRepository;

use sqlx::SqliteExecutor;

/// Runs a `SELECT EXISTS(...)` query bound to a single id.
pub(crate) async fn exists<'e, E>(exec: E, sql: &'static str, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let found: i64 = sqlx::query_scalar(sql).bind(id).fetch_one(exec).await?;
    Ok(found != 0)
}
