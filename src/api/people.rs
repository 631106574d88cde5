use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::db::{
    create_advisor, create_evaluator, create_student, delete_advisor, delete_evaluator,
    delete_student, get_advisor, get_evaluator, get_student, list_advisors, list_evaluators,
    list_students, update_advisor, update_evaluator, update_student,
};
use crate::models::{Advisor, Evaluator, PeopleQuery, Student};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt};

#[get("/students?<query..>")]
pub async fn api_list_students(
    query: PeopleQuery,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Student>>> {
    let students = list_students(db, &query).await.validate_custom()?;
    Ok(Json(students))
}

#[post("/students", data = "<student>")]
pub async fn api_create_student(
    student: Json<Student>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Student>>> {
    let student = student.validate_custom()?;
    let created = create_student(db, student).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[get("/students/<code>")]
pub async fn api_get_student(code: &str, db: &State<Pool<Sqlite>>) -> ApiResult<Json<Student>> {
    let student = get_student(db, code).await.validate_custom()?;
    Ok(Json(student))
}

#[put("/students/<code>", data = "<student>")]
pub async fn api_update_student(
    code: &str,
    mut student: Json<Student>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Student>> {
    // The path names the record; codes are never renamed.
    student.code = code.to_string();
    let student = student.validate_custom()?;
    let updated = update_student(db, student).await.validate_custom()?;
    Ok(Json(updated))
}

#[delete("/students/<code>")]
pub async fn api_delete_student(code: &str, db: &State<Pool<Sqlite>>) -> ApiResult<Status> {
    delete_student(db, code).await.validate_custom()?;
    Ok(Status::NoContent)
}

#[get("/advisors?<query..>")]
pub async fn api_list_advisors(
    query: PeopleQuery,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Advisor>>> {
    let advisors = list_advisors(db, &query).await.validate_custom()?;
    Ok(Json(advisors))
}

#[post("/advisors", data = "<advisor>")]
pub async fn api_create_advisor(
    advisor: Json<Advisor>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Advisor>>> {
    let advisor = advisor.validate_custom()?;
    let created = create_advisor(db, advisor).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[get("/advisors/<code>")]
pub async fn api_get_advisor(code: &str, db: &State<Pool<Sqlite>>) -> ApiResult<Json<Advisor>> {
    let advisor = get_advisor(db, code).await.validate_custom()?;
    Ok(Json(advisor))
}

#[put("/advisors/<code>", data = "<advisor>")]
pub async fn api_update_advisor(
    code: &str,
    mut advisor: Json<Advisor>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Advisor>> {
    advisor.code = code.to_string();
    let advisor = advisor.validate_custom()?;
    let updated = update_advisor(db, advisor).await.validate_custom()?;
    Ok(Json(updated))
}

#[delete("/advisors/<code>")]
pub async fn api_delete_advisor(code: &str, db: &State<Pool<Sqlite>>) -> ApiResult<Status> {
    delete_advisor(db, code).await.validate_custom()?;
    Ok(Status::NoContent)
}

#[get("/evaluators?<query..>")]
pub async fn api_list_evaluators(
    query: PeopleQuery,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Evaluator>>> {
    let evaluators = list_evaluators(db, &query).await.validate_custom()?;
    Ok(Json(evaluators))
}

#[post("/evaluators", data = "<evaluator>")]
pub async fn api_create_evaluator(
    evaluator: Json<Evaluator>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Evaluator>>> {
    let evaluator = evaluator.validate_custom()?;
    let created = create_evaluator(db, evaluator).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[get("/evaluators/<code>")]
pub async fn api_get_evaluator(
    code: &str,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Evaluator>> {
    let evaluator = get_evaluator(db, code).await.validate_custom()?;
    Ok(Json(evaluator))
}

#[put("/evaluators/<code>", data = "<evaluator>")]
pub async fn api_update_evaluator(
    code: &str,
    mut evaluator: Json<Evaluator>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Evaluator>> {
    evaluator.code = code.to_string();
    let evaluator = evaluator.validate_custom()?;
    let updated = update_evaluator(db, evaluator).await.validate_custom()?;
    Ok(Json(updated))
}

#[delete("/evaluators/<code>")]
pub async fn api_delete_evaluator(code: &str, db: &State<Pool<Sqlite>>) -> ApiResult<Status> {
    delete_evaluator(db, code).await.validate_custom()?;
    Ok(Status::NoContent)
}
