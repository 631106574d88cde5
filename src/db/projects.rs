use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument};

use crate::db::{delete_by_key, like_pattern, list_evaluations, row_exists};
use crate::error::AppError;
use crate::models::{
    DbParticipant, DbProject, ExtensionRequest, ExtensionRequestInput, InitialDocumentation,
    Participant, Participation, PeopleQuery, Project, ProjectDetail, ProjectFilter,
};
use crate::normalize::{key, prepare_for_write};

const PROJECT_COLUMNS: &str = "p.folio, p.title, p.modality, p.variant, p.competency_level, \
     p.ruling, p.registration_period, p.evidence_url, p.ruling_document_url, \
     p.advisor, p.evaluator, p.documentation";

#[instrument(skip(pool))]
pub async fn get_documentation(
    pool: &Pool<Sqlite>,
    folio: &str,
) -> Result<InitialDocumentation, AppError> {
    info!("Fetching initial documentation");
    let row = sqlx::query_as::<_, InitialDocumentation>(
        "SELECT folio, introduction, justification, objective, summary
         FROM initial_documentation WHERE folio = ?",
    )
    .bind(key(folio))
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| {
        AppError::NotFound(format!("Initial documentation {} not found", key(folio)))
    })
}

#[instrument(skip(pool))]
pub async fn list_documentation(
    pool: &Pool<Sqlite>,
    query: &PeopleQuery,
) -> Result<Vec<InitialDocumentation>, AppError> {
    info!("Listing initial documentation");
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT folio, introduction, justification, objective, summary FROM initial_documentation",
    );

    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(q);
        builder
            .push(" WHERE folio LIKE ")
            .push_bind(pattern.clone())
            .push(" OR summary LIKE ")
            .push_bind(pattern.clone())
            .push(" OR introduction LIKE ")
            .push_bind(pattern);
    }
    builder.push(" ORDER BY folio");

    let rows = builder
        .build_query_as::<InitialDocumentation>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn create_documentation(
    pool: &Pool<Sqlite>,
    documentation: InitialDocumentation,
) -> Result<InitialDocumentation, AppError> {
    info!("Creating initial documentation");
    let documentation = prepare_for_write(documentation)?;

    let mut tx = pool.begin().await?;
    if row_exists(&mut tx, "initial_documentation", "folio", &documentation.folio).await? {
        return Err(AppError::DuplicateKey(format!(
            "Initial documentation {} already exists",
            documentation.folio
        )));
    }

    sqlx::query(
        "INSERT INTO initial_documentation (folio, introduction, justification, objective, summary)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&documentation.folio)
    .bind(&documentation.introduction)
    .bind(&documentation.justification)
    .bind(&documentation.objective)
    .bind(&documentation.summary)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        AppError::from_write(e, &format!("initial documentation {}", documentation.folio))
    })?;
    tx.commit().await?;

    Ok(documentation)
}

#[instrument(skip(pool))]
pub async fn update_documentation(
    pool: &Pool<Sqlite>,
    documentation: InitialDocumentation,
) -> Result<InitialDocumentation, AppError> {
    info!("Updating initial documentation");
    let documentation = prepare_for_write(documentation)?;

    let result = sqlx::query(
        "UPDATE initial_documentation
         SET introduction = ?, justification = ?, objective = ?, summary = ?
         WHERE folio = ?",
    )
    .bind(&documentation.introduction)
    .bind(&documentation.justification)
    .bind(&documentation.objective)
    .bind(&documentation.summary)
    .bind(&documentation.folio)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Initial documentation {} not found",
            documentation.folio
        )));
    }

    Ok(documentation)
}

/// Deletes the documentation; a project linked to it keeps existing unlinked.
#[instrument(skip(pool))]
pub async fn delete_documentation(pool: &Pool<Sqlite>, folio: &str) -> Result<(), AppError> {
    info!("Deleting initial documentation");
    delete_by_key(
        pool,
        "initial_documentation",
        "folio",
        &key(folio),
        "Initial documentation",
    )
    .await
}

#[instrument(skip(pool))]
pub async fn get_project(pool: &Pool<Sqlite>, folio: &str) -> Result<Project, AppError> {
    info!("Fetching project by folio");
    let row = sqlx::query_as::<_, DbProject>(&format!(
        "SELECT {} FROM projects p WHERE p.folio = ?",
        PROJECT_COLUMNS
    ))
    .bind(key(folio))
    .fetch_optional(pool)
    .await?;

    match row {
        Some(project) => Project::try_from(project),
        None => Err(AppError::NotFound(format!(
            "Project {} not found",
            key(folio)
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn list_projects(
    pool: &Pool<Sqlite>,
    filter: &ProjectFilter,
) -> Result<Vec<Project>, AppError> {
    info!("Listing projects");
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM projects p
         LEFT JOIN advisors a ON a.code = p.advisor
         LEFT JOIN evaluators e ON e.code = p.evaluator
         WHERE 1 = 1",
        PROJECT_COLUMNS
    ));

    if let Some(modality) = filter.modality {
        builder.push(" AND p.modality = ").push_bind(modality.as_str());
    }
    if let Some(period) = filter.registration_period.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND p.registration_period = ")
            .push_bind(period.to_uppercase());
    }
    if let Some(ruling) = filter.ruling.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND p.ruling = ").push_bind(ruling.to_uppercase());
    }
    if let Some(advisor) = filter.advisor.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND p.advisor = ").push_bind(key(advisor));
    }
    if let Some(evaluator) = filter.evaluator.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND p.evaluator = ").push_bind(key(evaluator));
    }
    if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(q);
        builder
            .push(" AND (p.folio LIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.full_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.full_name LIKE ")
            .push_bind(pattern.clone())
            .push(
                " OR EXISTS (SELECT 1 FROM participations pa
                   JOIN students s ON s.code = pa.student
                   WHERE pa.project = p.folio AND s.full_name LIKE ",
            )
            .push_bind(pattern)
            .push("))");
    }
    builder.push(" ORDER BY p.folio");

    let rows = builder.build_query_as::<DbProject>().fetch_all(pool).await?;
    rows.into_iter().map(Project::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn create_project(pool: &Pool<Sqlite>, project: Project) -> Result<Project, AppError> {
    info!("Creating project");
    let project = prepare_for_write(project)?;

    let mut tx = pool.begin().await?;
    if row_exists(&mut tx, "projects", "folio", &project.folio).await? {
        return Err(AppError::DuplicateKey(format!(
            "Project {} already exists",
            project.folio
        )));
    }

    sqlx::query(
        "INSERT INTO projects (folio, title, modality, variant, competency_level, ruling,
             registration_period, evidence_url, ruling_document_url, advisor, evaluator,
             documentation)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&project.folio)
    .bind(&project.title)
    .bind(project.modality.as_str())
    .bind(&project.variant)
    .bind(&project.competency_level)
    .bind(&project.ruling)
    .bind(&project.registration_period)
    .bind(&project.evidence_url)
    .bind(&project.ruling_document_url)
    .bind(&project.advisor)
    .bind(&project.evaluator)
    .bind(&project.documentation)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, &format!("project {}", project.folio)))?;
    tx.commit().await?;

    Ok(project)
}

/// Rewrites every field of the project addressed by `project.folio`.
#[instrument(skip(pool))]
pub async fn update_project(pool: &Pool<Sqlite>, project: Project) -> Result<Project, AppError> {
    info!("Updating project");
    let project = prepare_for_write(project)?;

    let result = sqlx::query(
        "UPDATE projects
         SET title = ?, modality = ?, variant = ?, competency_level = ?, ruling = ?,
             registration_period = ?, evidence_url = ?, ruling_document_url = ?,
             advisor = ?, evaluator = ?, documentation = ?
         WHERE folio = ?",
    )
    .bind(&project.title)
    .bind(project.modality.as_str())
    .bind(&project.variant)
    .bind(&project.competency_level)
    .bind(&project.ruling)
    .bind(&project.registration_period)
    .bind(&project.evidence_url)
    .bind(&project.ruling_document_url)
    .bind(&project.advisor)
    .bind(&project.evaluator)
    .bind(&project.documentation)
    .bind(&project.folio)
    .execute(pool)
    .await
    .map_err(|e| AppError::from_write(e, &format!("project {}", project.folio)))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Project {} not found",
            project.folio
        )));
    }

    Ok(project)
}

/// Deletes the project together with its participations, extension requests
/// and evaluation history. People and documentation are untouched.
#[instrument(skip(pool))]
pub async fn delete_project(pool: &Pool<Sqlite>, folio: &str) -> Result<(), AppError> {
    info!("Deleting project");
    delete_by_key(pool, "projects", "folio", &key(folio), "Project").await
}

#[instrument(skip(pool))]
pub async fn get_project_detail(
    pool: &Pool<Sqlite>,
    folio: &str,
) -> Result<ProjectDetail, AppError> {
    info!("Fetching project detail");
    let project = get_project(pool, folio).await?;
    let participants = list_participants(pool, &project.folio).await?;
    let extension_requests = list_extension_requests(pool, &project.folio).await?;
    let evaluations = list_evaluations(pool, &project.folio).await?;

    Ok(ProjectDetail {
        project,
        participants,
        extension_requests,
        evaluations,
    })
}

/// Registers a student on a project. A pair can only be registered once.
#[instrument(skip(pool))]
pub async fn add_participation(
    pool: &Pool<Sqlite>,
    participation: Participation,
) -> Result<Participation, AppError> {
    info!("Adding participation");
    let participation = prepare_for_write(participation)?;

    let mut tx = pool.begin().await?;
    if !row_exists(&mut tx, "projects", "folio", &participation.project).await? {
        return Err(AppError::NotFound(format!(
            "Project {} not found",
            participation.project
        )));
    }
    if !row_exists(&mut tx, "students", "code", &participation.student).await? {
        return Err(AppError::NotFound(format!(
            "Student {} not found",
            participation.student
        )));
    }

    let already_registered = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM participations WHERE project = ? AND student = ?)",
    )
    .bind(&participation.project)
    .bind(&participation.student)
    .fetch_one(&mut *tx)
    .await?;

    if already_registered {
        return Err(AppError::ConstraintViolation(format!(
            "Student {} is already registered on project {}",
            participation.student, participation.project
        )));
    }

    sqlx::query(
        "INSERT INTO participations (project, student, is_representative) VALUES (?, ?, ?)",
    )
    .bind(&participation.project)
    .bind(&participation.student)
    .bind(participation.is_representative)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            &format!(
                "participation of {} on {}",
                participation.student, participation.project
            ),
        )
    })?;
    tx.commit().await?;

    Ok(participation)
}

#[instrument(skip(pool))]
pub async fn set_representative(
    pool: &Pool<Sqlite>,
    folio: &str,
    student_code: &str,
    is_representative: bool,
) -> Result<Participation, AppError> {
    info!("Updating participation representative flag");
    let project = key(folio);
    let student = key(student_code);

    let result = sqlx::query(
        "UPDATE participations SET is_representative = ? WHERE project = ? AND student = ?",
    )
    .bind(is_representative)
    .bind(&project)
    .bind(&student)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Student {} is not registered on project {}",
            student, project
        )));
    }

    Ok(Participation {
        project,
        student,
        is_representative,
    })
}

#[instrument(skip(pool))]
pub async fn remove_participation(
    pool: &Pool<Sqlite>,
    folio: &str,
    student_code: &str,
) -> Result<(), AppError> {
    info!("Removing participation");
    let result = sqlx::query("DELETE FROM participations WHERE project = ? AND student = ?")
        .bind(key(folio))
        .bind(key(student_code))
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Student {} is not registered on project {}",
            key(student_code),
            key(folio)
        )));
    }

    Ok(())
}

/// Participants of a project in registration order.
#[instrument(skip(pool))]
pub async fn list_participants(
    pool: &Pool<Sqlite>,
    folio: &str,
) -> Result<Vec<Participant>, AppError> {
    info!("Listing project participants");
    let rows = sqlx::query_as::<_, DbParticipant>(
        "SELECT s.code, s.full_name, s.email, pa.is_representative
         FROM participations pa
         JOIN students s ON s.code = pa.student
         WHERE pa.project = ?
         ORDER BY pa.rowid",
    )
    .bind(key(folio))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Participant::from).collect())
}

#[instrument(skip(pool))]
pub async fn list_participations(
    pool: &Pool<Sqlite>,
    representative: Option<bool>,
) -> Result<Vec<Participation>, AppError> {
    info!("Listing participations");
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT project, student, is_representative FROM participations",
    );
    if let Some(flag) = representative {
        builder.push(" WHERE is_representative = ").push_bind(flag);
    }
    builder.push(" ORDER BY project, student");

    let rows = builder
        .build_query_as::<Participation>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn get_extension_request(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<ExtensionRequest, AppError> {
    info!("Fetching extension request");
    let row = sqlx::query_as::<_, ExtensionRequest>(
        "SELECT id, project, justification, presentation_period
         FROM extension_requests WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Extension request {} not found", id)))
}

#[instrument(skip(pool))]
pub async fn list_extension_requests(
    pool: &Pool<Sqlite>,
    folio: &str,
) -> Result<Vec<ExtensionRequest>, AppError> {
    info!("Listing extension requests");
    let rows = sqlx::query_as::<_, ExtensionRequest>(
        "SELECT id, project, justification, presentation_period
         FROM extension_requests WHERE project = ? ORDER BY id",
    )
    .bind(key(folio))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn create_extension_request(
    pool: &Pool<Sqlite>,
    folio: &str,
    request: ExtensionRequestInput,
) -> Result<ExtensionRequest, AppError> {
    info!("Creating extension request");
    let request = prepare_for_write(request)?;
    let project = key(folio);

    let mut tx = pool.begin().await?;
    if !row_exists(&mut tx, "projects", "folio", &project).await? {
        return Err(AppError::NotFound(format!("Project {} not found", project)));
    }

    let result = sqlx::query(
        "INSERT INTO extension_requests (project, justification, presentation_period)
         VALUES (?, ?, ?)",
    )
    .bind(&project)
    .bind(&request.justification)
    .bind(&request.presentation_period)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, &format!("extension request for {}", project)))?;
    tx.commit().await?;

    Ok(ExtensionRequest {
        id: result.last_insert_rowid(),
        project,
        justification: request.justification,
        presentation_period: request.presentation_period,
    })
}

#[instrument(skip(pool))]
pub async fn update_extension_request(
    pool: &Pool<Sqlite>,
    id: i64,
    request: ExtensionRequestInput,
) -> Result<ExtensionRequest, AppError> {
    info!("Updating extension request");
    let request = prepare_for_write(request)?;

    let result = sqlx::query(
        "UPDATE extension_requests SET justification = ?, presentation_period = ? WHERE id = ?",
    )
    .bind(&request.justification)
    .bind(&request.presentation_period)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Extension request {} not found",
            id
        )));
    }

    get_extension_request(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_extension_request(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting extension request");
    let result = sqlx::query("DELETE FROM extension_requests WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Extension request {} not found",
            id
        )));
    }

    Ok(())
}
