use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::db::{
    add_participation, create_documentation, create_extension_request, create_project,
    delete_documentation, delete_extension_request, delete_project, get_documentation,
    get_extension_request, get_project, get_project_detail, list_documentation,
    list_extension_requests, list_participants, list_participations, list_projects,
    remove_participation, set_representative, update_documentation, update_extension_request,
    update_project,
};
use crate::models::{
    ExtensionRequest, ExtensionRequestInput, InitialDocumentation, Participant, Participation,
    PeopleQuery, Project, ProjectDetail, ProjectFilter,
};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt};

#[derive(Debug, Serialize, Deserialize)]
pub struct NewParticipant {
    pub student: String,
    #[serde(default)]
    pub is_representative: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepresentativeUpdate {
    pub is_representative: bool,
}

#[get("/documentation?<query..>")]
pub async fn api_list_documentation(
    query: PeopleQuery,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<InitialDocumentation>>> {
    let documentation = list_documentation(db, &query).await.validate_custom()?;
    Ok(Json(documentation))
}

#[post("/documentation", data = "<documentation>")]
pub async fn api_create_documentation(
    documentation: Json<InitialDocumentation>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<InitialDocumentation>>> {
    let documentation = documentation.validate_custom()?;
    let created = create_documentation(db, documentation)
        .await
        .validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[get("/documentation/<folio>")]
pub async fn api_get_documentation(
    folio: &str,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<InitialDocumentation>> {
    let documentation = get_documentation(db, folio).await.validate_custom()?;
    Ok(Json(documentation))
}

#[put("/documentation/<folio>", data = "<documentation>")]
pub async fn api_update_documentation(
    folio: &str,
    mut documentation: Json<InitialDocumentation>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<InitialDocumentation>> {
    documentation.folio = folio.to_string();
    let documentation = documentation.validate_custom()?;
    let updated = update_documentation(db, documentation)
        .await
        .validate_custom()?;
    Ok(Json(updated))
}

#[delete("/documentation/<folio>")]
pub async fn api_delete_documentation(
    folio: &str,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    delete_documentation(db, folio).await.validate_custom()?;
    Ok(Status::NoContent)
}

#[get("/projects?<filter..>")]
pub async fn api_list_projects(
    filter: ProjectFilter,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = list_projects(db, &filter).await.validate_custom()?;
    Ok(Json(projects))
}

#[post("/projects", data = "<project>")]
pub async fn api_create_project(
    project: Json<Project>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Project>>> {
    let project = project.validate_custom()?;
    let created = create_project(db, project).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[get("/projects/<folio>")]
pub async fn api_get_project(folio: &str, db: &State<Pool<Sqlite>>) -> ApiResult<Json<Project>> {
    let project = get_project(db, folio).await.validate_custom()?;
    Ok(Json(project))
}

#[get("/projects/<folio>/detail")]
pub async fn api_get_project_detail(
    folio: &str,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<ProjectDetail>> {
    let detail = get_project_detail(db, folio).await.validate_custom()?;
    Ok(Json(detail))
}

#[put("/projects/<folio>", data = "<project>")]
pub async fn api_update_project(
    folio: &str,
    mut project: Json<Project>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Project>> {
    project.folio = folio.to_string();
    let project = project.validate_custom()?;
    let updated = update_project(db, project).await.validate_custom()?;
    Ok(Json(updated))
}

#[delete("/projects/<folio>")]
pub async fn api_delete_project(folio: &str, db: &State<Pool<Sqlite>>) -> ApiResult<Status> {
    delete_project(db, folio).await.validate_custom()?;
    Ok(Status::NoContent)
}

#[get("/projects/<folio>/participants")]
pub async fn api_list_participants(
    folio: &str,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Participant>>> {
    // An unknown folio is a 404, not an empty list.
    get_project(db, folio).await.validate_custom()?;
    let participants = list_participants(db, folio).await.validate_custom()?;
    Ok(Json(participants))
}

#[post("/projects/<folio>/participants", data = "<participant>")]
pub async fn api_add_participant(
    folio: &str,
    participant: Json<NewParticipant>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Participation>>> {
    let participant = participant.into_inner();
    let participation = Participation {
        project: folio.to_string(),
        student: participant.student,
        is_representative: participant.is_representative,
    };

    let created = add_participation(db, participation)
        .await
        .validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[put("/projects/<folio>/participants/<code>", data = "<update>")]
pub async fn api_set_representative(
    folio: &str,
    code: &str,
    update: Json<RepresentativeUpdate>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Participation>> {
    let participation = set_representative(db, folio, code, update.is_representative)
        .await
        .validate_custom()?;
    Ok(Json(participation))
}

#[delete("/projects/<folio>/participants/<code>")]
pub async fn api_remove_participant(
    folio: &str,
    code: &str,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    remove_participation(db, folio, code).await.validate_custom()?;
    Ok(Status::NoContent)
}

#[get("/participations?<representative>")]
pub async fn api_list_participations(
    representative: Option<bool>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Participation>>> {
    let participations = list_participations(db, representative)
        .await
        .validate_custom()?;
    Ok(Json(participations))
}

#[get("/projects/<folio>/extensions")]
pub async fn api_list_extension_requests(
    folio: &str,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<ExtensionRequest>>> {
    get_project(db, folio).await.validate_custom()?;
    let requests = list_extension_requests(db, folio).await.validate_custom()?;
    Ok(Json(requests))
}

#[post("/projects/<folio>/extensions", data = "<request>")]
pub async fn api_create_extension_request(
    folio: &str,
    request: Json<ExtensionRequestInput>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<ExtensionRequest>>> {
    let request = request.validate_custom()?;
    let created = create_extension_request(db, folio, request)
        .await
        .validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[get("/extensions/<id>")]
pub async fn api_get_extension_request(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<ExtensionRequest>> {
    let request = get_extension_request(db, id).await.validate_custom()?;
    Ok(Json(request))
}

#[put("/extensions/<id>", data = "<request>")]
pub async fn api_update_extension_request(
    id: i64,
    request: Json<ExtensionRequestInput>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<ExtensionRequest>> {
    let request = request.validate_custom()?;
    let updated = update_extension_request(db, id, request)
        .await
        .validate_custom()?;
    Ok(Json(updated))
}

#[delete("/extensions/<id>")]
pub async fn api_delete_extension_request(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    delete_extension_request(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}
