use std::fmt;
use std::str::FromStr;

use anyhow::Error;
use rocket::{FromForm, FromFormField};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::models::{EvaluationRecord, Student};
use crate::normalize::{Normalize, blank_to_none, upper, upper_opt};

pub const DEFAULT_RULING: &str = "PENDING";

fn default_ruling() -> String {
    DEFAULT_RULING.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    #[field(value = "RESEARCH_WORK")]
    ResearchWork,
    #[field(value = "EDUCATIONAL_MATERIALS")]
    EducationalMaterials,
    #[field(value = "PROTOTYPE")]
    Prototype,
    #[field(value = "REPORT")]
    Report,
    #[field(value = "SOCIAL_OUTREACH")]
    SocialOutreach,
}

impl Modality {
    pub const ALL: [Modality; 5] = [
        Modality::ResearchWork,
        Modality::EducationalMaterials,
        Modality::Prototype,
        Modality::Report,
        Modality::SocialOutreach,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::ResearchWork => "RESEARCH_WORK",
            Modality::EducationalMaterials => "EDUCATIONAL_MATERIALS",
            Modality::Prototype => "PROTOTYPE",
            Modality::Report => "REPORT",
            Modality::SocialOutreach => "SOCIAL_OUTREACH",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Modality::ResearchWork => "Research work",
            Modality::EducationalMaterials => "Educational materials",
            Modality::Prototype => "Prototype",
            Modality::Report => "Report",
            Modality::SocialOutreach => "Social outreach",
        }
    }
}

impl FromStr for Modality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Modality::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::msg(format!("Unknown modality: {}", s)))
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The initial documentation ("format 1") submitted with a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct InitialDocumentation {
    #[validate(length(min = 1, max = 50, message = "Folio must be 1 to 50 characters"))]
    pub folio: String,
    #[validate(length(min = 1, message = "Introduction is required"))]
    pub introduction: String,
    #[validate(length(min = 1, message = "Justification is required"))]
    pub justification: String,
    #[validate(length(min = 1, message = "Objective is required"))]
    pub objective: String,
    #[validate(length(min = 1, message = "Summary is required"))]
    pub summary: String,
}

impl Normalize for InitialDocumentation {
    fn normalize(&mut self) {
        upper(&mut self.folio);
        upper(&mut self.introduction);
        upper(&mut self.justification);
        upper(&mut self.objective);
        upper(&mut self.summary);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Project {
    #[validate(length(min = 1, max = 50, message = "Folio must be 1 to 50 characters"))]
    pub folio: String,
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
    pub modality: Modality,
    #[validate(length(max = 50, message = "Variant must be at most 50 characters"))]
    #[serde(default)]
    pub variant: Option<String>,
    #[validate(length(max = 30, message = "Competency level must be at most 30 characters"))]
    #[serde(default)]
    pub competency_level: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Ruling must be 1 to 50 characters"))]
    #[serde(default = "default_ruling")]
    pub ruling: String,
    #[validate(length(
        min = 1,
        max = 10,
        message = "Registration period must be 1 to 10 characters"
    ))]
    pub registration_period: String,
    #[validate(
        url(message = "Evidence URL must be a valid URL"),
        length(max = 500, message = "Evidence URL must be at most 500 characters")
    )]
    #[serde(default)]
    pub evidence_url: Option<String>,
    #[validate(
        url(message = "Ruling document URL must be a valid URL"),
        length(max = 500, message = "Ruling document URL must be at most 500 characters")
    )]
    #[serde(default)]
    pub ruling_document_url: Option<String>,
    #[serde(default)]
    pub advisor: Option<String>,
    #[serde(default)]
    pub evaluator: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
}

impl Normalize for Project {
    fn normalize(&mut self) {
        upper(&mut self.folio);
        upper(&mut self.title);
        upper_opt(&mut self.variant);
        upper_opt(&mut self.competency_level);
        upper(&mut self.ruling);
        upper(&mut self.registration_period);
        blank_to_none(&mut self.evidence_url);
        blank_to_none(&mut self.ruling_document_url);
        upper_opt(&mut self.advisor);
        upper_opt(&mut self.evaluator);
        upper_opt(&mut self.documentation);
    }
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbProject {
    pub folio: Option<String>,
    pub title: Option<String>,
    pub modality: Option<String>,
    pub variant: Option<String>,
    pub competency_level: Option<String>,
    pub ruling: Option<String>,
    pub registration_period: Option<String>,
    pub evidence_url: Option<String>,
    pub ruling_document_url: Option<String>,
    pub advisor: Option<String>,
    pub evaluator: Option<String>,
    pub documentation: Option<String>,
}

impl TryFrom<DbProject> for Project {
    type Error = AppError;

    fn try_from(db: DbProject) -> Result<Self, Self::Error> {
        let modality = db
            .modality
            .unwrap_or_default()
            .parse::<Modality>()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Self {
            folio: db.folio.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            modality,
            variant: db.variant,
            competency_level: db.competency_level,
            ruling: db.ruling.unwrap_or_else(default_ruling),
            registration_period: db.registration_period.unwrap_or_default(),
            evidence_url: db.evidence_url,
            ruling_document_url: db.ruling_document_url,
            advisor: db.advisor,
            evaluator: db.evaluator,
            documentation: db.documentation,
        })
    }
}

/// Join row between a project and a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Participation {
    #[validate(length(min = 1, message = "Project folio is required"))]
    pub project: String,
    #[validate(length(min = 1, message = "Student code is required"))]
    pub student: String,
    #[serde(default)]
    pub is_representative: bool,
}

impl Normalize for Participation {
    fn normalize(&mut self) {
        upper(&mut self.project);
        upper(&mut self.student);
    }
}

/// A participation joined with the student it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub student: Student,
    pub is_representative: bool,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbParticipant {
    pub code: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub is_representative: Option<bool>,
}

impl From<DbParticipant> for Participant {
    fn from(db: DbParticipant) -> Self {
        Self {
            student: Student {
                code: db.code.unwrap_or_default(),
                full_name: db.full_name.unwrap_or_default(),
                email: db.email,
            },
            is_representative: db.is_representative.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExtensionRequest {
    pub id: i64,
    pub project: String,
    pub justification: String,
    pub presentation_period: String,
}

/// Caller-supplied fields of an extension request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExtensionRequestInput {
    #[validate(length(min = 1, message = "Justification is required"))]
    pub justification: String,
    #[validate(length(
        min = 1,
        max = 10,
        message = "Presentation period must be 1 to 10 characters"
    ))]
    pub presentation_period: String,
}

impl Normalize for ExtensionRequestInput {
    fn normalize(&mut self) {
        upper(&mut self.justification);
        upper(&mut self.presentation_period);
    }
}

#[derive(Debug, Clone, Default, FromForm)]
pub struct ProjectFilter {
    pub modality: Option<Modality>,
    pub registration_period: Option<String>,
    pub ruling: Option<String>,
    pub advisor: Option<String>,
    pub evaluator: Option<String>,
    /// Free text over folio, title and the names of advisor, evaluator and participants.
    pub q: Option<String>,
}

/// A project with the rows the console shows inline on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub participants: Vec<Participant>,
    pub extension_requests: Vec<ExtensionRequest>,
    pub evaluations: Vec<EvaluationRecord>,
}
