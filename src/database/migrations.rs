use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Connection, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, instrument, warn};

use crate::error::AppError;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[^\n]*(\n|$)").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r" *([(),]) *").expect("valid regex"));
static QUOTED_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(\w+)""#).expect("valid regex"));

/// What a migration run changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub tables_created: Vec<String>,
    pub tables_rebuilt: Vec<String>,
    pub indices_created: Vec<String>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.tables_created.is_empty()
            && self.tables_rebuilt.is_empty()
            && self.indices_created.is_empty()
    }
}

/// Brings a live database in line with a declarative schema.
///
/// The target schema is built in a pristine in-memory database and compared
/// object by object with the live one through `sqlite_master`. All changes
/// run in one transaction and are checked with `foreign_key_check` before
/// commit. Tables that only exist in the live database are left alone.
pub struct SchemaMigrator<'a> {
    pool: &'a SqlitePool,
    target_schema: &'a str,
}

impl<'a> SchemaMigrator<'a> {
    pub fn new(pool: &'a SqlitePool, target_schema: &'a str) -> Self {
        Self {
            pool,
            target_schema,
        }
    }

    #[instrument(skip_all)]
    pub async fn migrate(&self) -> Result<MigrationReport, AppError> {
        info!("Starting declarative schema migration");

        let pristine = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await?;
        sqlx::raw_sql(self.target_schema)
            .execute(&pristine)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to build pristine schema: {}", e)))?;

        // Table rebuilds drop referenced tables, which SQLite only allows
        // with enforcement off. It cannot be toggled inside a transaction.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let result = self.apply(&mut conn, &pristine).await;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await?;
        pristine.close().await;

        let report = result?;
        if report.is_empty() {
            info!("No schema changes needed");
        } else {
            info!(
                created = ?report.tables_created,
                rebuilt = ?report.tables_rebuilt,
                indices = ?report.indices_created,
                "Schema migration completed"
            );
        }

        Ok(report)
    }

    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        pristine: &SqlitePool,
    ) -> Result<MigrationReport, AppError> {
        let target_tables = schema_objects(pristine, "table").await?;
        let target_indices = schema_objects(pristine, "index").await?;

        let mut tx = conn.begin().await?;

        let current_tables = schema_objects(&mut *tx, "table").await?;
        let current_indices = schema_objects(&mut *tx, "index").await?;

        let mut report = MigrationReport::default();

        for (name, target_sql) in &target_tables {
            match current_tables.get(name) {
                None => {
                    execute_change(&mut tx, &format!("Create table {}", name), target_sql).await?;
                    report.tables_created.push(name.clone());
                }
                Some(current_sql) if normalize_sql(current_sql) != normalize_sql(target_sql) => {
                    let target_columns = table_columns(pristine, name).await?;
                    rebuild_table(&mut tx, name, target_sql, &target_columns).await?;
                    report.tables_rebuilt.push(name.clone());
                }
                Some(_) => {}
            }
        }

        for name in current_tables.keys() {
            if !target_tables.contains_key(name) {
                warn!(table = %name, "Table is not part of the target schema; leaving it in place");
            }
        }

        // Rebuilt tables lose their indices, so re-read before comparing.
        let live_indices = if report.tables_rebuilt.is_empty() {
            current_indices
        } else {
            schema_objects(&mut *tx, "index").await?
        };

        for (name, target_sql) in &target_indices {
            match live_indices.get(name) {
                Some(current_sql) if normalize_sql(current_sql) == normalize_sql(target_sql) => {}
                Some(_) => {
                    execute_change(
                        &mut tx,
                        &format!("Drop changed index {}", name),
                        &format!("DROP INDEX {}", name),
                    )
                    .await?;
                    execute_change(&mut tx, &format!("Recreate index {}", name), target_sql)
                        .await?;
                    report.indices_created.push(name.clone());
                }
                None => {
                    execute_change(&mut tx, &format!("Create index {}", name), target_sql).await?;
                    report.indices_created.push(name.clone());
                }
            }
        }

        let dangling = sqlx::query("PRAGMA foreign_key_check")
            .fetch_all(&mut *tx)
            .await?;
        if !dangling.is_empty() {
            return Err(AppError::Internal(format!(
                "Migration would leave {} dangling foreign key reference(s)",
                dangling.len()
            )));
        }

        tx.commit().await?;

        Ok(report)
    }
}

/// Recreates `name` with its target definition, keeping the data of every
/// column that survives. Refuses to drop columns.
async fn rebuild_table(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    name: &str,
    target_sql: &str,
    target_columns: &[String],
) -> Result<(), AppError> {
    info!("Rebuilding table: {}", name);

    let current_columns = table_columns(&mut **tx, name).await?;
    let target_set: BTreeSet<&String> = target_columns.iter().collect();

    let removed: Vec<&String> = current_columns
        .iter()
        .filter(|c| !target_set.contains(c))
        .collect();
    if !removed.is_empty() {
        return Err(AppError::Internal(format!(
            "Refusing to remove columns {:?} from table {}",
            removed, name
        )));
    }

    let temp_name = format!("{}_migration_new", name);
    let temp_sql = target_sql.replacen(
        &format!("CREATE TABLE {}", name),
        &format!("CREATE TABLE {}", temp_name),
        1,
    );
    execute_change(tx, &format!("Create temporary table for {}", name), &temp_sql).await?;

    let columns = current_columns.join(", ");
    execute_change(
        tx,
        &format!("Copy data into new {}", name),
        &format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            temp_name, columns, columns, name
        ),
    )
    .await?;
    execute_change(tx, &format!("Drop old {}", name), &format!("DROP TABLE {}", name)).await?;
    execute_change(
        tx,
        &format!("Rename new table to {}", name),
        &format!("ALTER TABLE {} RENAME TO {}", temp_name, name),
    )
    .await?;

    Ok(())
}

async fn execute_change(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    description: &str,
    sql: &str,
) -> Result<(), AppError> {
    info!("Database migration: {} with SQL:\n{}", description, sql);
    sqlx::query(sql).execute(&mut **tx).await?;
    Ok(())
}

async fn schema_objects<'e, E>(executor: E, kind: &str) -> Result<BTreeMap<String, String>, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT name, sql FROM sqlite_master
         WHERE type = ? AND sql IS NOT NULL AND name NOT LIKE 'sqlite_%'",
    )
    .bind(kind)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get::<String, _>(0), row.get::<String, _>(1)))
        .collect())
}

async fn table_columns<'e, E>(executor: E, table: &str) -> Result<Vec<String>, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().map(|row| row.get::<String, _>(1)).collect())
}

/// Canonical form of a CREATE statement for comparison.
pub fn normalize_sql(sql: &str) -> String {
    let sql = COMMENT.replace_all(sql, " ");
    let sql = WHITESPACE.replace_all(&sql, " ");
    let sql = PUNCTUATION.replace_all(&sql, "$1");
    let sql = QUOTED_IDENT.replace_all(&sql, "$1");

    sql.trim().to_string()
}

pub async fn migrate_schema(
    pool: &SqlitePool,
    target_schema: &str,
) -> Result<MigrationReport, AppError> {
    SchemaMigrator::new(pool, target_schema).migrate().await
}
