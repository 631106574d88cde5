#[cfg(test)]
mod tests {
    use crate::db::{get_project, list_evaluations};
    use crate::error::AppError;
    use crate::models::Modality;
    use crate::test::utils::{RecordingMailer, TEST_SENDER, TestDbBuilder, dispatcher, project};

    #[rocket::async_test]
    async fn test_no_addresses_anywhere_is_no_recipients() {
        let test_db = TestDbBuilder::new()
            .student("a01234567", "juan perez", None)
            .project("P-2024-001", "sensor", Modality::Prototype)
            .participant("P-2024-001", "A01234567", true)
            .build()
            .await
            .unwrap();
        let mailer = RecordingMailer::new();

        let result = dispatcher(&mailer)
            .notify_participants(&test_db.pool, "P-2024-001")
            .await;

        assert!(matches!(result, Err(AppError::NoRecipients(_))));
        assert!(mailer.sent().is_empty());
    }

    #[rocket::async_test]
    async fn test_participants_get_one_deduplicated_message() {
        let mut linked = project("P-1", "humidity sensor", Modality::Prototype);
        linked.advisor = Some("ADV1".to_string());
        linked.evaluator = Some("EV1".to_string());

        let test_db = TestDbBuilder::new()
            .student("A01", "first", Some("first@example.com"))
            .student("A02", "second", Some("maria@example.com"))
            .student("A03", "third", None)
            .advisor("ADV1", "maria", "maria@example.com")
            .evaluator("EV1", "luis", "luis@example.com", "electronics")
            .project_with(linked)
            .participant("P-1", "A01", true)
            .participant("P-1", "A02", false)
            .participant("P-1", "A03", false)
            .build()
            .await
            .unwrap();
        let mailer = RecordingMailer::new();

        let recipients = dispatcher(&mailer)
            .notify_participants(&test_db.pool, "p-1")
            .await
            .unwrap();

        assert_eq!(
            recipients,
            vec![
                "MARIA@EXAMPLE.COM",
                "LUIS@EXAMPLE.COM",
                "FIRST@EXAMPLE.COM"
            ]
        );

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Project notification P-1");
        assert_eq!(sent[0].from, TEST_SENDER);
        assert_eq!(sent[0].to, recipients);
        assert!(sent[0].body.contains("HUMIDITY SENSOR"));
    }

    #[rocket::async_test]
    async fn test_evaluator_without_assignment_is_missing_recipient() {
        let test_db = TestDbBuilder::new()
            .documentation("P-1")
            .project("P-1", "robot", Modality::Prototype)
            .build()
            .await
            .unwrap();
        let mailer = RecordingMailer::new();

        let result = dispatcher(&mailer)
            .notify_evaluator(&test_db.pool, "P-1")
            .await;

        assert!(matches!(result, Err(AppError::MissingRecipient(_))));
        assert!(mailer.sent().is_empty());
    }

    #[rocket::async_test]
    async fn test_evaluator_gets_documentation_sections() {
        let mut linked = project("P-1", "robot", Modality::Prototype);
        linked.evaluator = Some("EV1".to_string());
        linked.documentation = Some("DOC-7".to_string());

        let test_db = TestDbBuilder::new()
            .evaluator("EV1", "luis torres", "luis@example.com", "electronics")
            .documentation("DOC-7")
            .project_with(linked)
            .build()
            .await
            .unwrap();
        let mailer = RecordingMailer::new();

        let address = dispatcher(&mailer)
            .notify_evaluator(&test_db.pool, "P-1")
            .await
            .unwrap();
        assert_eq!(address, "LUIS@EXAMPLE.COM");

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Assigned project notification");
        assert_eq!(sent[0].to, vec!["LUIS@EXAMPLE.COM"]);
        assert!(sent[0].body.starts_with("Dear LUIS TORRES,"));
        for section in [
            "INTRODUCTION OF DOC-7",
            "JUSTIFICATION OF DOC-7",
            "OBJECTIVE OF DOC-7",
            "SUMMARY OF DOC-7",
        ] {
            assert!(sent[0].body.contains(section), "missing {}", section);
        }
    }

    #[rocket::async_test]
    async fn test_evaluator_documentation_falls_back_to_folio() {
        let mut unlinked = project("P-1", "robot", Modality::Prototype);
        unlinked.evaluator = Some("EV1".to_string());

        let test_db = TestDbBuilder::new()
            .evaluator("EV1", "luis", "luis@example.com", "electronics")
            .documentation("P-1")
            .project_with(unlinked)
            .build()
            .await
            .unwrap();
        let mailer = RecordingMailer::new();

        dispatcher(&mailer)
            .notify_evaluator(&test_db.pool, "P-1")
            .await
            .unwrap();

        assert!(mailer.sent()[0].body.contains("SUMMARY OF P-1"));
    }

    #[rocket::async_test]
    async fn test_evaluator_without_documentation_is_not_found() {
        let mut unlinked = project("P-1", "robot", Modality::Prototype);
        unlinked.evaluator = Some("EV1".to_string());

        let test_db = TestDbBuilder::new()
            .evaluator("EV1", "luis", "luis@example.com", "electronics")
            .project_with(unlinked)
            .build()
            .await
            .unwrap();
        let mailer = RecordingMailer::new();

        let result = dispatcher(&mailer)
            .notify_evaluator(&test_db.pool, "P-1")
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(mailer.sent().is_empty());
    }

    #[rocket::async_test]
    async fn test_transport_failure_is_surfaced_and_records_untouched() {
        let mut linked = project("P-1", "robot", Modality::Prototype);
        linked.advisor = Some("ADV1".to_string());

        let test_db = TestDbBuilder::new()
            .advisor("ADV1", "maria", "maria@example.com")
            .project_with(linked)
            .build()
            .await
            .unwrap();
        let before = get_project(&test_db.pool, "P-1").await.unwrap();
        let mailer = RecordingMailer::failing();

        let result = dispatcher(&mailer)
            .notify_participants(&test_db.pool, "P-1")
            .await;

        assert!(matches!(result, Err(AppError::Transport(_))));
        assert_eq!(get_project(&test_db.pool, "P-1").await.unwrap(), before);
        assert!(list_evaluations(&test_db.pool, "P-1").await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn test_unknown_project_is_not_found() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let mailer = RecordingMailer::new();

        let result = dispatcher(&mailer)
            .notify_participants(&test_db.pool, "P-404")
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
