use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::db::{
    append_evaluation, delete_evaluation, get_evaluation, get_project, list_evaluations,
    update_evaluation,
};
use crate::models::{EvaluationInput, EvaluationRecord};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt};

#[get("/projects/<folio>/evaluations")]
pub async fn api_list_evaluations(
    folio: &str,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<EvaluationRecord>>> {
    get_project(db, folio).await.validate_custom()?;
    let evaluations = list_evaluations(db, folio).await.validate_custom()?;
    Ok(Json(evaluations))
}

#[post("/projects/<folio>/evaluations", data = "<evaluation>")]
pub async fn api_append_evaluation(
    folio: &str,
    evaluation: Json<EvaluationInput>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<EvaluationRecord>>> {
    let evaluation = evaluation.validate_custom()?;
    let record = append_evaluation(db, folio, evaluation)
        .await
        .validate_custom()?;
    Ok(Custom(Status::Created, Json(record)))
}

#[get("/evaluations/<id>")]
pub async fn api_get_evaluation(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<EvaluationRecord>> {
    let record = get_evaluation(db, id).await.validate_custom()?;
    Ok(Json(record))
}

#[put("/evaluations/<id>", data = "<evaluation>")]
pub async fn api_update_evaluation(
    id: i64,
    evaluation: Json<EvaluationInput>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<EvaluationRecord>> {
    let evaluation = evaluation.validate_custom()?;
    let record = update_evaluation(db, id, evaluation)
        .await
        .validate_custom()?;
    Ok(Json(record))
}

#[delete("/evaluations/<id>")]
pub async fn api_delete_evaluation(id: i64, db: &State<Pool<Sqlite>>) -> ApiResult<Status> {
    delete_evaluation(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}
