pub mod console;
pub mod evaluations;
pub mod people;
pub mod projects;

pub use console::*;
pub use evaluations::*;
pub use people::*;
pub use projects::*;

use rocket::Request;
use rocket::http::Status;

use crate::validation::{ApiError, ToValidationResponse};

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

/// JSON body for errors Rocket raises before a handler runs (unknown route,
/// unparseable body).
#[catch(default)]
pub fn api_default_catcher(status: Status, _request: &Request<'_>) -> ApiError {
    status.to_validation_response()
}
