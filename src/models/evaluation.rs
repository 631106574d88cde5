use std::fmt;
use std::str::FromStr;

use anyhow::Error;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::normalize::{Normalize, upper, upper_opt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewType {
    #[default]
    FormReview,
    ContentReview,
    FinalRuling,
}

impl ReviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::FormReview => "FORM_REVIEW",
            ReviewType::ContentReview => "CONTENT_REVIEW",
            ReviewType::FinalRuling => "FINAL_RULING",
        }
    }
}

impl FromStr for ReviewType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FORM_REVIEW" => Ok(ReviewType::FormReview),
            "CONTENT_REVIEW" => Ok(ReviewType::ContentReview),
            "FINAL_RULING" => Ok(ReviewType::FinalRuling),
            _ => Err(Error::msg(format!("Unknown review type: {}", s))),
        }
    }
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    Approved,
    Rejected,
    PendingCorrections,
    NotApplicable,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Approved => "APPROVED",
            Resolution::Rejected => "REJECTED",
            Resolution::PendingCorrections => "PENDING_CORRECTIONS",
            Resolution::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(Resolution::Approved),
            "REJECTED" => Ok(Resolution::Rejected),
            "PENDING_CORRECTIONS" => Ok(Resolution::PendingCorrections),
            "NOT_APPLICABLE" => Ok(Resolution::NotApplicable),
            _ => Err(Error::msg(format!("Unknown resolution: {}", s))),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One review decision in a project's evaluation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: i64,
    pub project: String,
    pub evaluator: Option<String>,
    /// Assigned when the record is appended; never rewritten.
    pub evaluated_at: DateTime<Utc>,
    pub review_type: ReviewType,
    pub resolution: Resolution,
    pub remarks: String,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbEvaluationRecord {
    pub id: Option<i64>,
    pub project: Option<String>,
    pub evaluator: Option<String>,
    pub evaluated_at: Option<NaiveDateTime>,
    pub review_type: Option<String>,
    pub resolution: Option<String>,
    pub remarks: Option<String>,
}

impl TryFrom<DbEvaluationRecord> for EvaluationRecord {
    type Error = AppError;

    fn try_from(db: DbEvaluationRecord) -> Result<Self, Self::Error> {
        let review_type = match db.review_type {
            Some(value) => value
                .parse::<ReviewType>()
                .map_err(|e| AppError::Internal(e.to_string()))?,
            None => ReviewType::default(),
        };
        let resolution = db
            .resolution
            .unwrap_or_default()
            .parse::<Resolution>()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let evaluated_at = db
            .evaluated_at
            .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
            .ok_or_else(|| AppError::Internal("Evaluation record has no timestamp".to_string()))?;

        Ok(Self {
            id: db.id.unwrap_or_default(),
            project: db.project.unwrap_or_default(),
            evaluator: db.evaluator,
            evaluated_at,
            review_type,
            resolution,
            remarks: db.remarks.unwrap_or_default(),
        })
    }
}

/// Caller-supplied fields of an evaluation record. The timestamp is not one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EvaluationInput {
    #[serde(default)]
    pub evaluator: Option<String>,
    #[serde(default)]
    pub review_type: ReviewType,
    pub resolution: Resolution,
    #[validate(length(min = 1, message = "Remarks are required"))]
    pub remarks: String,
}

impl Normalize for EvaluationInput {
    fn normalize(&mut self) {
        upper_opt(&mut self.evaluator);
        upper(&mut self.remarks);
    }
}
