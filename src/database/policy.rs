use sqlx::SqliteConnection;
use tracing::{debug, instrument};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the referencing rows along with the target.
    Cascade,
    /// Keep the referencing rows and set the reference to NULL.
    Clear,
}

#[derive(Debug, Clone, Copy)]
pub struct Relationship {
    pub child_table: &'static str,
    pub child_column: &'static str,
    pub parent_table: &'static str,
    pub on_delete: OnDelete,
}

const fn rel(
    child_table: &'static str,
    child_column: &'static str,
    parent_table: &'static str,
    on_delete: OnDelete,
) -> Relationship {
    Relationship {
        child_table,
        child_column,
        parent_table,
        on_delete,
    }
}

/// Every foreign key in the schema and what happens to it when its target is deleted.
pub const RELATIONSHIPS: &[Relationship] = &[
    rel("participations", "project", "projects", OnDelete::Cascade),
    rel("participations", "student", "students", OnDelete::Cascade),
    rel("extension_requests", "project", "projects", OnDelete::Cascade),
    rel("evaluations", "project", "projects", OnDelete::Cascade),
    rel("evaluations", "evaluator", "evaluators", OnDelete::Clear),
    rel("projects", "advisor", "advisors", OnDelete::Clear),
    rel("projects", "evaluator", "evaluators", OnDelete::Clear),
    rel("projects", "documentation", "initial_documentation", OnDelete::Clear),
];

pub fn relationships_to(parent_table: &str) -> impl Iterator<Item = &'static Relationship> + '_ {
    RELATIONSHIPS
        .iter()
        .filter(move |r| r.parent_table == parent_table)
}

/// Applies the on-delete policy of every relationship pointing at
/// `parent_table` row `key`. Must run in the same transaction as the delete.
///
/// Cascaded children are never themselves parents, so one level is enough.
#[instrument(skip(conn))]
pub async fn apply_on_delete(
    conn: &mut SqliteConnection,
    parent_table: &str,
    key: &str,
) -> Result<(), AppError> {
    for relationship in relationships_to(parent_table) {
        let sql = match relationship.on_delete {
            OnDelete::Cascade => format!(
                "DELETE FROM {} WHERE {} = ?",
                relationship.child_table, relationship.child_column
            ),
            OnDelete::Clear => format!(
                "UPDATE {} SET {} = NULL WHERE {} = ?",
                relationship.child_table, relationship.child_column, relationship.child_column
            ),
        };

        let result = sqlx::query(&sql).bind(key).execute(&mut *conn).await?;
        debug!(
            child = %relationship.child_table,
            column = %relationship.child_column,
            policy = ?relationship.on_delete,
            rows = result.rows_affected(),
            "Applied on-delete policy"
        );
    }

    Ok(())
}
