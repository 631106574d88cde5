use std::sync::{Arc, Mutex, Once};

use rocket::local::asynchronous::Client;
use sqlx::{Pool, Sqlite};
use tracing_subscriber::EnvFilter;

use crate::database::connect_in_memory;
use crate::db::{
    add_participation, create_advisor, create_documentation, create_evaluator, create_project,
    create_student,
};
use crate::error::AppError;
use crate::mail::{MailError, MailTransport, OutgoingMail};
use crate::models::{
    Advisor, Evaluator, InitialDocumentation, Modality, Participation, Project, Student,
};
use crate::notifications::NotificationDispatcher;

static INIT: Once = Once::new();

pub const TEST_SENDER: &str = "noreply@sigap.test";

pub fn init_test_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    });
}

/// A project with only the required fields set.
pub fn project(folio: &str, title: &str, modality: Modality) -> Project {
    Project {
        folio: folio.to_string(),
        title: title.to_string(),
        modality,
        variant: None,
        competency_level: None,
        ruling: "PENDING".to_string(),
        registration_period: "2024B".to_string(),
        evidence_url: None,
        ruling_document_url: None,
        advisor: None,
        evaluator: None,
        documentation: None,
    }
}

pub fn documentation(folio: &str) -> InitialDocumentation {
    InitialDocumentation {
        folio: folio.to_string(),
        introduction: format!("introduction of {}", folio),
        justification: format!("justification of {}", folio),
        objective: format!("objective of {}", folio),
        summary: format!("summary of {}", folio),
    }
}

#[derive(Default)]
pub struct TestDbBuilder {
    students: Vec<Student>,
    advisors: Vec<Advisor>,
    evaluators: Vec<Evaluator>,
    documentation: Vec<InitialDocumentation>,
    projects: Vec<Project>,
    participations: Vec<Participation>,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn student(mut self, code: &str, full_name: &str, email: Option<&str>) -> Self {
        self.students.push(Student {
            code: code.to_string(),
            full_name: full_name.to_string(),
            email: email.map(String::from),
        });
        self
    }

    pub fn advisor(mut self, code: &str, full_name: &str, email: &str) -> Self {
        self.advisors.push(Advisor {
            code: code.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
        });
        self
    }

    pub fn evaluator(
        mut self,
        code: &str,
        full_name: &str,
        email: &str,
        specialization: &str,
    ) -> Self {
        self.evaluators.push(Evaluator {
            code: code.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            specialization: specialization.to_string(),
        });
        self
    }

    pub fn documentation(mut self, folio: &str) -> Self {
        self.documentation.push(documentation(folio));
        self
    }

    pub fn project(self, folio: &str, title: &str, modality: Modality) -> Self {
        self.project_with(project(folio, title, modality))
    }

    pub fn project_with(mut self, project: Project) -> Self {
        self.projects.push(project);
        self
    }

    pub fn participant(mut self, folio: &str, student: &str, is_representative: bool) -> Self {
        self.participations.push(Participation {
            project: folio.to_string(),
            student: student.to_string(),
            is_representative,
        });
        self
    }

    pub async fn build(self) -> Result<TestDb, AppError> {
        init_test_tracing();

        let pool = connect_in_memory().await?;

        for student in self.students {
            create_student(&pool, student).await?;
        }
        for advisor in self.advisors {
            create_advisor(&pool, advisor).await?;
        }
        for evaluator in self.evaluators {
            create_evaluator(&pool, evaluator).await?;
        }
        for documentation in self.documentation {
            create_documentation(&pool, documentation).await?;
        }
        for project in self.projects {
            create_project(&pool, project).await?;
        }
        for participation in self.participations {
            add_participation(&pool, participation).await?;
        }

        Ok(TestDb { pool })
    }
}

pub struct TestDb {
    pub pool: Pool<Sqlite>,
}

impl TestDb {
    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count rows")
    }
}

/// Captures outgoing mail, or fails every send when built with [`RecordingMailer::failing`].
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

#[rocket::async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Build("relay refused the message".to_string()));
        }
        self.sent
            .lock()
            .expect("mailer lock poisoned")
            .push(mail.clone());
        Ok(())
    }
}

pub fn dispatcher(mailer: &Arc<RecordingMailer>) -> NotificationDispatcher {
    NotificationDispatcher::new(mailer.clone(), TEST_SENDER)
}

pub async fn setup_test_client(test_db: TestDb, mailer: &Arc<RecordingMailer>) -> Client {
    let rocket = crate::init_rocket(test_db.pool, dispatcher(mailer)).await;
    Client::tracked(rocket)
        .await
        .expect("Failed to create test client")
}
