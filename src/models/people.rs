use rocket::FromForm;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::normalize::{Normalize, upper, upper_opt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Student {
    #[validate(length(min = 1, max = 9, message = "Student code must be 1 to 9 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "Full name must be 1 to 200 characters"))]
    pub full_name: String,
    #[validate(
        email(message = "Email must be a valid address"),
        length(max = 100, message = "Email must be at most 100 characters")
    )]
    #[serde(default)]
    pub email: Option<String>,
}

impl Normalize for Student {
    fn normalize(&mut self) {
        upper(&mut self.code);
        upper(&mut self.full_name);
        upper_opt(&mut self.email);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Advisor {
    #[validate(length(min = 1, max = 20, message = "Advisor code must be 1 to 20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "Full name must be 1 to 200 characters"))]
    pub full_name: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
}

impl Normalize for Advisor {
    fn normalize(&mut self) {
        upper(&mut self.code);
        upper(&mut self.full_name);
        upper(&mut self.email);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Evaluator {
    #[validate(length(min = 1, max = 20, message = "Evaluator code must be 1 to 20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "Full name must be 1 to 200 characters"))]
    pub full_name: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Specialization must be 1 to 100 characters"
    ))]
    pub specialization: String,
}

impl Normalize for Evaluator {
    fn normalize(&mut self) {
        upper(&mut self.code);
        upper(&mut self.full_name);
        upper(&mut self.email);
        upper(&mut self.specialization);
    }
}

/// Free-text search over people. Matches code, full name and email.
#[derive(Debug, Clone, Default, FromForm)]
pub struct PeopleQuery {
    pub q: Option<String>,
    /// Only honoured for evaluators.
    pub specialization: Option<String>,
}
