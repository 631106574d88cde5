use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::db::row_exists;
use crate::error::AppError;
use crate::models::{DbEvaluationRecord, EvaluationInput, EvaluationRecord};
use crate::normalize::{key, prepare_for_write};

#[instrument(skip(pool))]
pub async fn get_evaluation(pool: &Pool<Sqlite>, id: i64) -> Result<EvaluationRecord, AppError> {
    info!("Fetching evaluation record");
    let row = sqlx::query_as::<_, DbEvaluationRecord>(
        "SELECT id, project, evaluator, evaluated_at, review_type, resolution, remarks
         FROM evaluations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(record) => EvaluationRecord::try_from(record),
        None => Err(AppError::NotFound(format!(
            "Evaluation record {} not found",
            id
        ))),
    }
}

/// Evaluation history of a project, most recent first.
#[instrument(skip(pool))]
pub async fn list_evaluations(
    pool: &Pool<Sqlite>,
    folio: &str,
) -> Result<Vec<EvaluationRecord>, AppError> {
    info!("Listing evaluation history");
    let rows = sqlx::query_as::<_, DbEvaluationRecord>(
        "SELECT id, project, evaluator, evaluated_at, review_type, resolution, remarks
         FROM evaluations
         WHERE project = ?
         ORDER BY evaluated_at DESC, id DESC",
    )
    .bind(key(folio))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(EvaluationRecord::try_from).collect()
}

/// Appends a record to the project's history, stamped with the current time.
#[instrument(skip(pool))]
pub async fn append_evaluation(
    pool: &Pool<Sqlite>,
    folio: &str,
    input: EvaluationInput,
) -> Result<EvaluationRecord, AppError> {
    info!("Appending evaluation record");
    let input = prepare_for_write(input)?;
    let project = key(folio);
    let evaluated_at = Utc::now().naive_utc();

    let mut tx = pool.begin().await?;
    if !row_exists(&mut tx, "projects", "folio", &project).await? {
        return Err(AppError::NotFound(format!("Project {} not found", project)));
    }

    let result = sqlx::query(
        "INSERT INTO evaluations (project, evaluator, evaluated_at, review_type, resolution, remarks)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&project)
    .bind(&input.evaluator)
    .bind(evaluated_at)
    .bind(input.review_type.as_str())
    .bind(input.resolution.as_str())
    .bind(&input.remarks)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, &format!("evaluation of {}", project)))?;
    tx.commit().await?;

    Ok(EvaluationRecord {
        id: result.last_insert_rowid(),
        project,
        evaluator: input.evaluator,
        evaluated_at: evaluated_at.and_utc(),
        review_type: input.review_type,
        resolution: input.resolution,
        remarks: input.remarks,
    })
}

/// Rewrites the caller-supplied fields of a record. The original timestamp
/// and project are kept.
#[instrument(skip(pool))]
pub async fn update_evaluation(
    pool: &Pool<Sqlite>,
    id: i64,
    input: EvaluationInput,
) -> Result<EvaluationRecord, AppError> {
    info!("Updating evaluation record");
    let input = prepare_for_write(input)?;

    let result = sqlx::query(
        "UPDATE evaluations
         SET evaluator = ?, review_type = ?, resolution = ?, remarks = ?
         WHERE id = ?",
    )
    .bind(&input.evaluator)
    .bind(input.review_type.as_str())
    .bind(input.resolution.as_str())
    .bind(&input.remarks)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| AppError::from_write(e, &format!("evaluation record {}", id)))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Evaluation record {} not found",
            id
        )));
    }

    get_evaluation(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_evaluation(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting evaluation record");
    let result = sqlx::query("DELETE FROM evaluations WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Evaluation record {} not found",
            id
        )));
    }

    Ok(())
}
