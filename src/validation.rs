use std::collections::HashMap;

use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::error::AppError;
use crate::normalize::Normalize;

pub type ApiError = Custom<Json<ValidationResponse>>;
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ValidationResponse {
    pub status: String,
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationResponse {
    pub fn new(errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            status: "error".to_string(),
            errors,
        }
    }

    pub fn with_error(field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::new(errors)
    }
}

pub trait ToValidationResponse {
    fn to_validation_response(self) -> ApiError;
}

impl ToValidationResponse for AppError {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        self.log_and_record("API error response");
        let status = self.status_code();

        let (field, message) = match &self {
            AppError::Database(_) => ("database", "Database error".to_string()),
            AppError::NotFound(msg) => ("resource", msg.clone()),
            AppError::DuplicateKey(msg) => ("key", msg.clone()),
            AppError::ConstraintViolation(msg) => ("constraint", msg.clone()),
            AppError::Validation(msg) => ("validation", msg.clone()),
            AppError::NoRecipients(msg) => ("recipients", msg.clone()),
            AppError::MissingRecipient(msg) => ("recipient", msg.clone()),
            AppError::Transport(msg) => ("mail", format!("Mail could not be sent: {}", msg)),
            AppError::Internal(_) => ("server", "Internal server error".to_string()),
        };

        Custom(status, Json(ValidationResponse::with_error(field, &message)))
    }
}

impl ToValidationResponse for Status {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        let (field, message) = match self.code {
            404 => ("resource", "Resource not found"),
            409 => ("resource", "Resource already exists"),
            400 => ("request", "Bad request"),
            422 => ("request", "Request body could not be parsed"),
            500 => ("server", "Internal server error"),
            503 => ("service", "Service unavailable"),
            _ => ("error", "An error occurred"),
        };

        Custom(self, Json(ValidationResponse::with_error(field, message)))
    }
}

#[derive(Debug)]
pub struct ValidationErrorWrapper(pub validator::ValidationErrors);

impl From<ValidationErrorWrapper> for ApiError {
    #[instrument]
    fn from(wrapper: ValidationErrorWrapper) -> Self {
        let errors = wrapper.0;
        let mut error_map = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let error_messages: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .clone()
                        .unwrap_or_else(|| "Invalid value".into())
                        .to_string()
                })
                .collect();

            error_map.insert(field.to_string(), error_messages);
        }

        Custom(
            Status::UnprocessableEntity,
            Json(ValidationResponse::new(error_map)),
        )
    }
}

/// Normalizes and validates a JSON body, answering field-level errors.
pub trait JsonValidateExt<T> {
    fn validate_custom(self) -> ApiResult<T>;
}

impl<T> JsonValidateExt<T> for Json<T>
where
    T: Normalize + Validate,
{
    fn validate_custom(self) -> ApiResult<T> {
        let mut record = self.into_inner();
        record.normalize();
        record
            .validate()
            .map_err(|e| ApiError::from(ValidationErrorWrapper(e)))?;
        Ok(record)
    }
}

pub trait AppErrorExt<T> {
    fn validate_custom(self) -> ApiResult<T>;
}

impl<T> AppErrorExt<T> for Result<T, AppError> {
    fn validate_custom(self) -> ApiResult<T> {
        self.map_err(ToValidationResponse::to_validation_response)
    }
}
