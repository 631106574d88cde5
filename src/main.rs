#[macro_use]
extern crate rocket;

mod api;
mod config;
mod database;
mod db;
mod env;
mod error;
mod mail;
mod models;
mod normalize;
mod notifications;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use std::sync::Arc;

use api::{
    api_add_participant, api_append_evaluation, api_create_advisor, api_create_documentation,
    api_create_evaluator, api_create_extension_request, api_create_project, api_create_student,
    api_default_catcher, api_delete_advisor, api_delete_documentation, api_delete_evaluation,
    api_delete_evaluator, api_delete_extension_request, api_delete_project, api_delete_student,
    api_get_advisor, api_get_documentation, api_get_evaluation, api_get_evaluator,
    api_get_extension_request, api_get_project, api_get_project_detail, api_get_student,
    api_list_advisors, api_list_documentation, api_list_evaluations, api_list_evaluators,
    api_list_extension_requests, api_list_participants, api_list_participations,
    api_list_projects, api_list_students, api_remove_participant, api_set_representative,
    api_update_advisor, api_update_documentation, api_update_evaluation, api_update_evaluator,
    api_update_extension_request, api_update_project, api_update_student, console_banner,
    console_send_email, console_send_evaluator_email, health,
};
use config::AppConfig;
use database::{CURRENT_SCHEMA, connect, migrate_schema};
use error::AppError;
use mail::{LogMailer, MailTransport, SmtpMailer};
use notifications::NotificationDispatcher;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use telemetry::{TelemetryFairing, init_tracing};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    let env_files = env::load_environment()?;
    init_tracing()?;
    for env_file in &env_files {
        info!("Loaded environment from: {}", env_file);
    }

    let config = AppConfig::from_env();
    let pool = connect(&config.database_url, config.max_connections).await?;

    info!("Running database migrations...");
    migrate_schema(&pool, CURRENT_SCHEMA).await?;

    let dispatcher = build_dispatcher(&config)?;

    init_rocket(pool, dispatcher).await.launch().await?;

    Ok(())
}

fn build_dispatcher(config: &AppConfig) -> Result<NotificationDispatcher, AppError> {
    let transport: Arc<dyn MailTransport> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "Delivering notifications over SMTP");
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            warn!("SMTP_HOST not set; notifications will be logged instead of sent");
            Arc::new(LogMailer)
        }
    };

    Ok(NotificationDispatcher::new(transport, config.mail_from.clone()))
}

pub async fn init_rocket(pool: SqlitePool, dispatcher: NotificationDispatcher) -> Rocket<Build> {
    info!("Starting SIGAP");

    rocket::build()
        .manage(pool)
        .manage(dispatcher)
        .mount(
            "/api",
            routes![
                api_list_students,
                api_create_student,
                api_get_student,
                api_update_student,
                api_delete_student,
                api_list_advisors,
                api_create_advisor,
                api_get_advisor,
                api_update_advisor,
                api_delete_advisor,
                api_list_evaluators,
                api_create_evaluator,
                api_get_evaluator,
                api_update_evaluator,
                api_delete_evaluator,
                api_list_documentation,
                api_create_documentation,
                api_get_documentation,
                api_update_documentation,
                api_delete_documentation,
                api_list_projects,
                api_create_project,
                api_get_project,
                api_get_project_detail,
                api_update_project,
                api_delete_project,
                api_list_participants,
                api_add_participant,
                api_set_representative,
                api_remove_participant,
                api_list_participations,
                api_list_extension_requests,
                api_create_extension_request,
                api_get_extension_request,
                api_update_extension_request,
                api_delete_extension_request,
                api_list_evaluations,
                api_append_evaluation,
                api_get_evaluation,
                api_update_evaluation,
                api_delete_evaluation,
            ],
        )
        .register("/api", catchers![api_default_catcher])
        .mount(
            "/admin",
            routes![
                console_send_email,
                console_send_evaluator_email,
                console_banner
            ],
        )
        .mount("/", routes![health])
        .attach(TelemetryFairing)
}
