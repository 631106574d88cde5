use opentelemetry_semantic_conventions::{attribute::OTEL_STATUS_CODE, trace::ERROR_TYPE};
use rocket::http::Status;
use thiserror::Error;
use tracing::{Span, error, warn};

use crate::database::RECORD_KEYS;
use crate::mail::MailError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No recipients: {0}")]
    NoRecipients(String),

    #[error("Missing recipient: {0}")]
    MissingRecipient(String),

    #[error("Mail transport failure: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn log_and_record(&self, ctx: &str) {
        let current_span = Span::current();
        let is_valid_span = !current_span.is_none();

        let message = self.to_string();
        let error_kind = match self {
            AppError::Database(err) => {
                error!(error = %message, context = %ctx, db_error = %err, "Database error");
                "database_error"
            }
            AppError::NotFound(msg) => {
                warn!(message = %msg, context = %ctx, "Not found error");
                "not_found_error"
            }
            AppError::DuplicateKey(msg) => {
                warn!(message = %msg, context = %ctx, "Duplicate key");
                "duplicate_key_error"
            }
            AppError::ConstraintViolation(msg) => {
                warn!(message = %msg, context = %ctx, "Constraint violation");
                "constraint_violation_error"
            }
            AppError::Validation(msg) => {
                warn!(message = %msg, context = %ctx, "Validation error");
                "validation_error"
            }
            AppError::NoRecipients(msg) => {
                warn!(message = %msg, context = %ctx, "Notification has no recipients");
                "no_recipients_error"
            }
            AppError::MissingRecipient(msg) => {
                warn!(message = %msg, context = %ctx, "Notification recipient missing");
                "missing_recipient_error"
            }
            AppError::Transport(msg) => {
                error!(message = %msg, context = %ctx, "Mail transport failure");
                "transport_error"
            }
            AppError::Internal(msg) => {
                error!(message = %msg, context = %ctx, "Internal server error");
                "internal_error"
            }
        };

        if is_valid_span {
            current_span.record("error", tracing::field::display(true));
            current_span.record(ERROR_TYPE, tracing::field::display(error_kind));
            current_span.record("error.message", tracing::field::display(&message));

            match self {
                AppError::Database(_) | AppError::Internal(_) | AppError::Transport(_) => {
                    current_span.record(OTEL_STATUS_CODE, tracing::field::display("ERROR"));
                }
                _ => {}
            }
        }
    }

    pub fn status_code(&self) -> Status {
        match self {
            AppError::Database(_) => Status::InternalServerError,
            AppError::NotFound(_) => Status::NotFound,
            AppError::DuplicateKey(_) => Status::Conflict,
            AppError::ConstraintViolation(_) => Status::Conflict,
            AppError::Validation(_) => Status::UnprocessableEntity,
            AppError::NoRecipients(_) => Status::UnprocessableEntity,
            AppError::MissingRecipient(_) => Status::UnprocessableEntity,
            AppError::Transport(_) => Status::ServiceUnavailable,
            AppError::Internal(_) => Status::InternalServerError,
        }
    }

    /// Maps a sqlx error raised by a write into the domain taxonomy.
    /// `what` names the record being written, e.g. `project P-2024-001`.
    ///
    /// A unique violation on a record's natural key (a concurrent create that
    /// passed the existence check) is `DuplicateKey`; any other uniqueness
    /// rule, including the participation pair, is `ConstraintViolation`.
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                if violates_record_key(db_err.message()) {
                    return AppError::DuplicateKey(format!("{} already exists", what));
                }
                return AppError::ConstraintViolation(format!(
                    "{} violates a uniqueness rule: {}",
                    what,
                    db_err.message()
                ));
            }
            if db_err.is_foreign_key_violation() {
                return AppError::ConstraintViolation(format!(
                    "{} references a record that does not exist",
                    what
                ));
            }
            if db_err.is_check_violation() {
                return AppError::ConstraintViolation(format!(
                    "{} failed a check constraint: {}",
                    what,
                    db_err.message()
                ));
            }
        }
        AppError::Database(err)
    }
}

/// SQLite reports unique failures as `UNIQUE constraint failed: table.column`.
fn violates_record_key(message: &str) -> bool {
    let Some(columns) = message.strip_prefix("UNIQUE constraint failed: ") else {
        return false;
    };
    RECORD_KEYS
        .iter()
        .any(|(table, column)| columns == format!("{}.{}", table, column))
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<MailError> for AppError {
    fn from(error: MailError) -> Self {
        AppError::Transport(error.to_string())
    }
}
