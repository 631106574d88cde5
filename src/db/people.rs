use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument};

use crate::db::{delete_by_key, like_pattern, row_exists};
use crate::error::AppError;
use crate::models::{Advisor, Evaluator, PeopleQuery, Student};
use crate::normalize::{key, prepare_for_write};

#[instrument(skip(pool))]
pub async fn get_student(pool: &Pool<Sqlite>, code: &str) -> Result<Student, AppError> {
    info!("Fetching student by code");
    let row = sqlx::query_as::<_, Student>(
        "SELECT code, full_name, email FROM students WHERE code = ?",
    )
    .bind(key(code))
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Student {} not found", key(code))))
}

#[instrument(skip(pool))]
pub async fn list_students(
    pool: &Pool<Sqlite>,
    query: &PeopleQuery,
) -> Result<Vec<Student>, AppError> {
    info!("Listing students");
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT code, full_name, email FROM students");

    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(q);
        builder
            .push(" WHERE code LIKE ")
            .push_bind(pattern.clone())
            .push(" OR full_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern);
    }
    builder.push(" ORDER BY code");

    let students = builder.build_query_as::<Student>().fetch_all(pool).await?;
    Ok(students)
}

#[instrument(skip(pool))]
pub async fn create_student(pool: &Pool<Sqlite>, student: Student) -> Result<Student, AppError> {
    info!("Creating student");
    let student = prepare_for_write(student)?;

    let mut tx = pool.begin().await?;
    if row_exists(&mut tx, "students", "code", &student.code).await? {
        return Err(AppError::DuplicateKey(format!(
            "Student {} already exists",
            student.code
        )));
    }

    sqlx::query("INSERT INTO students (code, full_name, email) VALUES (?, ?, ?)")
        .bind(&student.code)
        .bind(&student.full_name)
        .bind(&student.email)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, &format!("student {}", student.code)))?;
    tx.commit().await?;

    Ok(student)
}

/// Rewrites every field of the student addressed by `student.code`.
#[instrument(skip(pool))]
pub async fn update_student(pool: &Pool<Sqlite>, student: Student) -> Result<Student, AppError> {
    info!("Updating student");
    let student = prepare_for_write(student)?;

    let result = sqlx::query("UPDATE students SET full_name = ?, email = ? WHERE code = ?")
        .bind(&student.full_name)
        .bind(&student.email)
        .bind(&student.code)
        .execute(pool)
        .await
        .map_err(|e| AppError::from_write(e, &format!("student {}", student.code)))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Student {} not found",
            student.code
        )));
    }

    Ok(student)
}

/// Deletes the student and every participation naming them.
#[instrument(skip(pool))]
pub async fn delete_student(pool: &Pool<Sqlite>, code: &str) -> Result<(), AppError> {
    info!("Deleting student");
    delete_by_key(pool, "students", "code", &key(code), "Student").await
}

#[instrument(skip(pool))]
pub async fn get_advisor(pool: &Pool<Sqlite>, code: &str) -> Result<Advisor, AppError> {
    info!("Fetching advisor by code");
    let row = sqlx::query_as::<_, Advisor>(
        "SELECT code, full_name, email FROM advisors WHERE code = ?",
    )
    .bind(key(code))
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Advisor {} not found", key(code))))
}

#[instrument(skip(pool))]
pub async fn list_advisors(
    pool: &Pool<Sqlite>,
    query: &PeopleQuery,
) -> Result<Vec<Advisor>, AppError> {
    info!("Listing advisors");
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT code, full_name, email FROM advisors");

    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(q);
        builder
            .push(" WHERE code LIKE ")
            .push_bind(pattern.clone())
            .push(" OR full_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern);
    }
    builder.push(" ORDER BY code");

    let advisors = builder.build_query_as::<Advisor>().fetch_all(pool).await?;
    Ok(advisors)
}

#[instrument(skip(pool))]
pub async fn create_advisor(pool: &Pool<Sqlite>, advisor: Advisor) -> Result<Advisor, AppError> {
    info!("Creating advisor");
    let advisor = prepare_for_write(advisor)?;

    let mut tx = pool.begin().await?;
    if row_exists(&mut tx, "advisors", "code", &advisor.code).await? {
        return Err(AppError::DuplicateKey(format!(
            "Advisor {} already exists",
            advisor.code
        )));
    }

    sqlx::query("INSERT INTO advisors (code, full_name, email) VALUES (?, ?, ?)")
        .bind(&advisor.code)
        .bind(&advisor.full_name)
        .bind(&advisor.email)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, &format!("advisor {}", advisor.code)))?;
    tx.commit().await?;

    Ok(advisor)
}

#[instrument(skip(pool))]
pub async fn update_advisor(pool: &Pool<Sqlite>, advisor: Advisor) -> Result<Advisor, AppError> {
    info!("Updating advisor");
    let advisor = prepare_for_write(advisor)?;

    let result = sqlx::query("UPDATE advisors SET full_name = ?, email = ? WHERE code = ?")
        .bind(&advisor.full_name)
        .bind(&advisor.email)
        .bind(&advisor.code)
        .execute(pool)
        .await
        .map_err(|e| AppError::from_write(e, &format!("advisor {}", advisor.code)))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Advisor {} not found",
            advisor.code
        )));
    }

    Ok(advisor)
}

/// Deletes the advisor; projects they advised keep existing without one.
#[instrument(skip(pool))]
pub async fn delete_advisor(pool: &Pool<Sqlite>, code: &str) -> Result<(), AppError> {
    info!("Deleting advisor");
    delete_by_key(pool, "advisors", "code", &key(code), "Advisor").await
}

#[instrument(skip(pool))]
pub async fn get_evaluator(pool: &Pool<Sqlite>, code: &str) -> Result<Evaluator, AppError> {
    info!("Fetching evaluator by code");
    let row = sqlx::query_as::<_, Evaluator>(
        "SELECT code, full_name, email, specialization FROM evaluators WHERE code = ?",
    )
    .bind(key(code))
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Evaluator {} not found", key(code))))
}

#[instrument(skip(pool))]
pub async fn list_evaluators(
    pool: &Pool<Sqlite>,
    query: &PeopleQuery,
) -> Result<Vec<Evaluator>, AppError> {
    info!("Listing evaluators");
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT code, full_name, email, specialization FROM evaluators WHERE 1 = 1",
    );

    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(q);
        builder
            .push(" AND (code LIKE ")
            .push_bind(pattern.clone())
            .push(" OR full_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(specialization) = query.specialization.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND specialization = ")
            .push_bind(specialization.to_uppercase());
    }
    builder.push(" ORDER BY code");

    let evaluators = builder.build_query_as::<Evaluator>().fetch_all(pool).await?;
    Ok(evaluators)
}

#[instrument(skip(pool))]
pub async fn create_evaluator(
    pool: &Pool<Sqlite>,
    evaluator: Evaluator,
) -> Result<Evaluator, AppError> {
    info!("Creating evaluator");
    let evaluator = prepare_for_write(evaluator)?;

    let mut tx = pool.begin().await?;
    if row_exists(&mut tx, "evaluators", "code", &evaluator.code).await? {
        return Err(AppError::DuplicateKey(format!(
            "Evaluator {} already exists",
            evaluator.code
        )));
    }

    sqlx::query(
        "INSERT INTO evaluators (code, full_name, email, specialization) VALUES (?, ?, ?, ?)",
    )
    .bind(&evaluator.code)
    .bind(&evaluator.full_name)
    .bind(&evaluator.email)
    .bind(&evaluator.specialization)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, &format!("evaluator {}", evaluator.code)))?;
    tx.commit().await?;

    Ok(evaluator)
}

#[instrument(skip(pool))]
pub async fn update_evaluator(
    pool: &Pool<Sqlite>,
    evaluator: Evaluator,
) -> Result<Evaluator, AppError> {
    info!("Updating evaluator");
    let evaluator = prepare_for_write(evaluator)?;

    let result = sqlx::query(
        "UPDATE evaluators SET full_name = ?, email = ?, specialization = ? WHERE code = ?",
    )
    .bind(&evaluator.full_name)
    .bind(&evaluator.email)
    .bind(&evaluator.specialization)
    .bind(&evaluator.code)
    .execute(pool)
    .await
    .map_err(|e| AppError::from_write(e, &format!("evaluator {}", evaluator.code)))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Evaluator {} not found",
            evaluator.code
        )));
    }

    Ok(evaluator)
}

/// Deletes the evaluator; projects and evaluation records keep existing
/// with the reference cleared.
#[instrument(skip(pool))]
pub async fn delete_evaluator(pool: &Pool<Sqlite>, code: &str) -> Result<(), AppError> {
    info!("Deleting evaluator");
    delete_by_key(pool, "evaluators", "code", &key(code), "Evaluator").await
}
