use std::sync::Arc;

use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::db::{get_advisor, get_documentation, get_evaluator, get_project, list_participants};
use crate::error::AppError;
use crate::mail::{MailTransport, OutgoingMail};
use crate::models::{Evaluator, InitialDocumentation, Participant, Project};

/// Runs the two console mail actions. Both block until the transport answers
/// and never touch stored records.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn MailTransport>,
    sender: String,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, sender: impl Into<String>) -> Self {
        Self {
            transport,
            sender: sender.into(),
        }
    }

    /// Mails the advisor, the evaluator and every participant of the project.
    /// Returns the addresses the message went to.
    #[instrument(skip(self, pool))]
    pub async fn notify_participants(
        &self,
        pool: &Pool<Sqlite>,
        folio: &str,
    ) -> Result<Vec<String>, AppError> {
        info!("Notifying project participants");
        let project = get_project(pool, folio).await?;

        let advisor_email = match &project.advisor {
            Some(code) => Some(get_advisor(pool, code).await?.email),
            None => None,
        };
        let evaluator_email = match &project.evaluator {
            Some(code) => Some(get_evaluator(pool, code).await?.email),
            None => None,
        };
        let participants = list_participants(pool, &project.folio).await?;

        let recipients = collect_recipients(
            advisor_email.as_deref(),
            evaluator_email.as_deref(),
            &participants,
        );
        if recipients.is_empty() {
            return Err(AppError::NoRecipients(format!(
                "No email addresses are registered for project {}",
                project.folio
            )));
        }

        let mail = OutgoingMail {
            subject: format!("Project notification {}", project.folio),
            body: participants_body(&project),
            from: self.sender.clone(),
            to: recipients.clone(),
        };
        self.transport.send(&mail).await?;

        info!(recipients = recipients.len(), "Participants notified");
        Ok(recipients)
    }

    /// Mails the assigned evaluator the project's initial documentation.
    #[instrument(skip(self, pool))]
    pub async fn notify_evaluator(
        &self,
        pool: &Pool<Sqlite>,
        folio: &str,
    ) -> Result<String, AppError> {
        info!("Notifying project evaluator");
        let project = get_project(pool, folio).await?;

        let evaluator = match &project.evaluator {
            Some(code) => Some(get_evaluator(pool, code).await?),
            None => None,
        };
        let evaluator = evaluator
            .filter(|e| !e.email.trim().is_empty())
            .ok_or_else(|| {
                AppError::MissingRecipient(format!(
                    "Project {} has no evaluator email registered",
                    project.folio
                ))
            })?;

        let documentation = documentation_for(pool, &project).await?;

        let mail = OutgoingMail {
            subject: "Assigned project notification".to_string(),
            body: evaluator_body(&project, &evaluator, &documentation),
            from: self.sender.clone(),
            to: vec![evaluator.email.clone()],
        };
        self.transport.send(&mail).await?;

        info!(evaluator = %evaluator.code, "Evaluator notified");
        Ok(evaluator.email)
    }
}

/// The linked documentation, else the one filed under the project's folio.
async fn documentation_for(
    pool: &Pool<Sqlite>,
    project: &Project,
) -> Result<InitialDocumentation, AppError> {
    let folio = project.documentation.as_deref().unwrap_or(&project.folio);

    let documentation = match get_documentation(pool, folio).await {
        Err(AppError::NotFound(_)) if folio != project.folio => {
            get_documentation(pool, &project.folio).await
        }
        other => other,
    };

    documentation.map_err(|e| match e {
        AppError::NotFound(_) => AppError::NotFound(format!(
            "Project {} has no initial documentation",
            project.folio
        )),
        e => e,
    })
}

/// Advisor, evaluator, then participants in registration order; blanks
/// skipped and each address kept once.
pub fn collect_recipients(
    advisor_email: Option<&str>,
    evaluator_email: Option<&str>,
    participants: &[Participant],
) -> Vec<String> {
    let candidates = advisor_email
        .into_iter()
        .chain(evaluator_email)
        .chain(
            participants
                .iter()
                .filter_map(|p| p.student.email.as_deref()),
        );

    let mut recipients: Vec<String> = Vec::new();
    for email in candidates.map(str::trim).filter(|e| !e.is_empty()) {
        if !recipients.iter().any(|r| r.eq_ignore_ascii_case(email)) {
            recipients.push(email.to_string());
        }
    }
    recipients
}

fn participants_body(project: &Project) -> String {
    format!(
        "Dear participants,\n\n\
         This is a notice about the project '{}' (folio: {}).\n\n\
         Please check your SIGAP account for more information.\n\n\
         Regards,\nEvaluation Committee",
        project.title, project.folio
    )
}

fn evaluator_body(
    project: &Project,
    evaluator: &Evaluator,
    documentation: &InitialDocumentation,
) -> String {
    format!(
        "Dear {},\n\n\
         You have been assigned the following project:\n\
         Folio: {}\n\
         Title: {}\n\
         Modality: {}\n\n\
         Introduction:\n{}\n\n\
         Justification:\n{}\n\n\
         Objective:\n{}\n\n\
         Summary:\n{}\n\n\
         Please sign in to SIGAP to continue the evaluation.\n\n\
         Regards,\nEvaluation Committee",
        evaluator.full_name,
        project.folio,
        project.title,
        project.modality.label(),
        documentation.introduction,
        documentation.justification,
        documentation.objective,
        documentation.summary
    )
}
