#[cfg(test)]
mod tests {
    use crate::db::{
        append_evaluation, create_advisor, create_evaluator, create_student, delete_advisor,
        delete_evaluator, delete_student, get_advisor, get_evaluation, get_evaluator, get_project,
        get_student, list_evaluators, list_participants, list_students, update_advisor,
        update_evaluator, update_student,
    };
    use crate::error::AppError;
    use crate::models::{
        Advisor, Evaluator, EvaluationInput, Modality, PeopleQuery, Resolution, ReviewType,
        Student,
    };
    use crate::test::utils::TestDbBuilder;

    #[rocket::async_test]
    async fn test_student_is_stored_upper_cased() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let created = create_student(
            &test_db.pool,
            Student {
                code: "a01234567".to_string(),
                full_name: "juan perez".to_string(),
                email: Some("juan@example.com".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(created.code, "A01234567");
        assert_eq!(created.full_name, "JUAN PEREZ");

        let stored = get_student(&test_db.pool, "A01234567").await.unwrap();
        assert_eq!(stored.full_name, "JUAN PEREZ");
        assert_eq!(stored.email.as_deref(), Some("JUAN@EXAMPLE.COM"));
    }

    #[rocket::async_test]
    async fn test_lookup_is_case_insensitive() {
        let test_db = TestDbBuilder::new()
            .student("abc123", "ana lopez", None)
            .build()
            .await
            .unwrap();

        let lower = get_student(&test_db.pool, "abc123").await.unwrap();
        let upper = get_student(&test_db.pool, "ABC123").await.unwrap();

        assert_eq!(lower, upper);
        assert_eq!(lower.code, "ABC123");
    }

    #[rocket::async_test]
    async fn test_missing_code_is_not_found() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let result = get_student(&test_db.pool, "NOPE").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = get_advisor(&test_db.pool, "NOPE").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = delete_evaluator(&test_db.pool, "NOPE").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn test_duplicate_code_is_rejected() {
        let test_db = TestDbBuilder::new()
            .student("A01", "first", None)
            .build()
            .await
            .unwrap();

        let result = create_student(
            &test_db.pool,
            Student {
                code: "a01".to_string(),
                full_name: "second".to_string(),
                email: None,
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::DuplicateKey(_))));
        let stored = get_student(&test_db.pool, "A01").await.unwrap();
        assert_eq!(stored.full_name, "FIRST");
    }

    #[rocket::async_test]
    async fn test_update_renormalizes_and_clears_empty_email() {
        let test_db = TestDbBuilder::new()
            .student("A01", "first", Some("first@example.com"))
            .build()
            .await
            .unwrap();

        let updated = update_student(
            &test_db.pool,
            Student {
                code: "a01".to_string(),
                full_name: "first renamed".to_string(),
                email: Some(String::new()),
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.full_name, "FIRST RENAMED");
        let stored = get_student(&test_db.pool, "A01").await.unwrap();
        assert_eq!(stored.email, None);
        assert_eq!(stored.full_name, "FIRST RENAMED");
    }

    #[rocket::async_test]
    async fn test_update_missing_student_is_not_found() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let result = update_student(
            &test_db.pool,
            Student {
                code: "A99".to_string(),
                full_name: "ghost".to_string(),
                email: None,
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn test_invalid_email_fails_validation() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let result = create_advisor(
            &test_db.pool,
            Advisor {
                code: "ADV1".to_string(),
                full_name: "maria".to_string(),
                email: "not-an-email".to_string(),
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(matches!(
            get_advisor(&test_db.pool, "ADV1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn test_deleting_student_removes_only_their_participation() {
        let test_db = TestDbBuilder::new()
            .student("A01", "first", None)
            .student("A02", "second", None)
            .project("P-1", "robot", Modality::Prototype)
            .participant("P-1", "A01", true)
            .participant("P-1", "A02", false)
            .build()
            .await
            .unwrap();

        delete_student(&test_db.pool, "a01").await.unwrap();

        assert!(get_project(&test_db.pool, "P-1").await.is_ok());
        let participants = list_participants(&test_db.pool, "P-1").await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].student.code, "A02");
        assert!(matches!(
            get_student(&test_db.pool, "A01").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn test_deleting_advisor_clears_project_reference() {
        let mut project = crate::test::utils::project("P-1", "robot", Modality::Prototype);
        project.advisor = Some("ADV1".to_string());

        let test_db = TestDbBuilder::new()
            .advisor("ADV1", "maria", "maria@example.com")
            .project_with(project)
            .build()
            .await
            .unwrap();

        delete_advisor(&test_db.pool, "ADV1").await.unwrap();

        let project = get_project(&test_db.pool, "P-1").await.unwrap();
        assert_eq!(project.advisor, None);
    }

    #[rocket::async_test]
    async fn test_deleting_evaluator_clears_project_and_history_references() {
        let mut project = crate::test::utils::project("P-1", "robot", Modality::Prototype);
        project.evaluator = Some("EV1".to_string());

        let test_db = TestDbBuilder::new()
            .evaluator("EV1", "luis", "luis@example.com", "electronics")
            .project_with(project)
            .build()
            .await
            .unwrap();

        let record = append_evaluation(
            &test_db.pool,
            "P-1",
            EvaluationInput {
                evaluator: Some("ev1".to_string()),
                review_type: ReviewType::FormReview,
                resolution: Resolution::Approved,
                remarks: "looks fine".to_string(),
            },
        )
        .await
        .unwrap();

        delete_evaluator(&test_db.pool, "EV1").await.unwrap();

        let project = get_project(&test_db.pool, "P-1").await.unwrap();
        assert_eq!(project.evaluator, None);

        let record = get_evaluation(&test_db.pool, record.id).await.unwrap();
        assert_eq!(record.evaluator, None);
        assert_eq!(record.remarks, "LOOKS FINE");
    }

    #[rocket::async_test]
    async fn test_list_students_searches_name_and_code() {
        let test_db = TestDbBuilder::new()
            .student("A01", "juan perez", None)
            .student("A02", "ana lopez", Some("ana@example.com"))
            .student("B03", "pedro juarez", None)
            .build()
            .await
            .unwrap();

        let all = list_students(&test_db.pool, &PeopleQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let query = PeopleQuery {
            q: Some("ju".to_string()),
            specialization: None,
        };
        let codes: Vec<String> = list_students(&test_db.pool, &query)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.code)
            .collect();
        assert_eq!(codes, vec!["A01", "B03"]);

        let query = PeopleQuery {
            q: Some("a0".to_string()),
            specialization: None,
        };
        assert_eq!(list_students(&test_db.pool, &query).await.unwrap().len(), 2);
    }

    #[rocket::async_test]
    async fn test_list_evaluators_filters_by_specialization() {
        let test_db = TestDbBuilder::new()
            .evaluator("EV1", "luis", "luis@example.com", "electronics")
            .evaluator("EV2", "rosa", "rosa@example.com", "software")
            .build()
            .await
            .unwrap();

        let query = PeopleQuery {
            q: None,
            specialization: Some("software".to_string()),
        };
        let evaluators = list_evaluators(&test_db.pool, &query).await.unwrap();

        assert_eq!(evaluators.len(), 1);
        assert_eq!(evaluators[0].code, "EV2");
    }

    #[rocket::async_test]
    async fn test_evaluator_fields_are_all_normalized() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let created = create_evaluator(
            &test_db.pool,
            Evaluator {
                code: "ev9".to_string(),
                full_name: "rosa m".to_string(),
                email: "rosa@example.com".to_string(),
                specialization: "software".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(created.code, "EV9");
        assert_eq!(created.full_name, "ROSA M");
        assert_eq!(created.email, "ROSA@EXAMPLE.COM");
        assert_eq!(created.specialization, "SOFTWARE");
    }

    #[rocket::async_test]
    async fn test_update_advisor_upper_cases_every_field() {
        let test_db = TestDbBuilder::new()
            .advisor("ADV1", "maria", "maria@example.com")
            .build()
            .await
            .unwrap();

        let updated = update_advisor(
            &test_db.pool,
            Advisor {
                code: "adv1".to_string(),
                full_name: "maria lopez".to_string(),
                email: "m.lopez@example.com".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.code, "ADV1");

        let stored = get_advisor(&test_db.pool, "adv1").await.unwrap();
        assert_eq!(
            stored,
            Advisor {
                code: "ADV1".to_string(),
                full_name: "MARIA LOPEZ".to_string(),
                email: "M.LOPEZ@EXAMPLE.COM".to_string(),
            }
        );
    }

    #[rocket::async_test]
    async fn test_update_evaluator_upper_cases_every_field() {
        let test_db = TestDbBuilder::new()
            .evaluator("EV1", "luis", "luis@example.com", "electronics")
            .build()
            .await
            .unwrap();

        update_evaluator(
            &test_db.pool,
            Evaluator {
                code: "ev1".to_string(),
                full_name: "luis torres".to_string(),
                email: "l.torres@example.com".to_string(),
                specialization: "embedded systems".to_string(),
            },
        )
        .await
        .unwrap();

        let stored = get_evaluator(&test_db.pool, "EV1").await.unwrap();
        assert_eq!(
            stored,
            Evaluator {
                code: "EV1".to_string(),
                full_name: "LUIS TORRES".to_string(),
                email: "L.TORRES@EXAMPLE.COM".to_string(),
                specialization: "EMBEDDED SYSTEMS".to_string(),
            }
        );
    }

    #[rocket::async_test]
    async fn test_update_missing_advisor_or_evaluator_is_not_found() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let result = update_advisor(
            &test_db.pool,
            Advisor {
                code: "ADV9".to_string(),
                full_name: "ghost".to_string(),
                email: "ghost@example.com".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = update_evaluator(
            &test_db.pool,
            Evaluator {
                code: "EV9".to_string(),
                full_name: "ghost".to_string(),
                email: "ghost@example.com".to_string(),
                specialization: "none".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
