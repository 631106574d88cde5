pub mod evaluations;
pub mod people;
pub mod projects;

pub use evaluations::*;
pub use people::*;
pub use projects::*;

use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::info;

use crate::database::apply_on_delete;
use crate::error::AppError;

pub(crate) async fn row_exists(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    key: &str,
) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?)",
        table, column
    ))
    .bind(key)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

/// Deletes one row addressed by its natural key after applying the on-delete
/// policy of every relationship pointing at it, all in one transaction.
pub(crate) async fn delete_by_key(
    pool: &Pool<Sqlite>,
    table: &str,
    key_column: &str,
    key: &str,
    label: &str,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    if !row_exists(&mut tx, table, key_column, key).await? {
        return Err(AppError::NotFound(format!("{} {} not found", label, key)));
    }

    apply_on_delete(&mut tx, table, key).await?;

    sqlx::query(&format!("DELETE FROM {} WHERE {} = ?", table, key_column))
        .bind(key)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, &format!("{} {}", label, key)))?;

    tx.commit().await?;
    info!(table = %table, key = %key, "Deleted record");

    Ok(())
}

/// `%TEXT%` pattern for a case-insensitive search over upper-cased columns.
pub(crate) fn like_pattern(query: &str) -> String {
    format!("%{}%", query.trim().to_uppercase())
}
