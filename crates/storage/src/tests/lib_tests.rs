use chrono::{Duration, TimeZone, Utc};

use super::*;

fn at(day: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 4, day, 10, 0, 0).single().expect("date")
}

async fn memory() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

fn submission_type(name: &str, days: i64) -> NewProjectType {
    NewProjectType {
        name: name.to_string(),
        category: ProjectCategory::Submission,
        default_processing_days: days,
        requires_employee: false,
        required_tag_id: None,
        channel_id: None,
    }
}

fn deadline_type(name: &str) -> NewProjectType {
    NewProjectType {
        category: ProjectCategory::Deadline,
        default_processing_days: 30,
        ..submission_type(name, 0)
    }
}

fn draft(name: &str, type_id: ProjectTypeId) -> ProjectDraft {
    ProjectDraft {
        name: name.to_string(),
        type_id,
        submit_date: None,
        deadline_date: None,
        employee_id: None,
    }
}

fn storage_error(error: &anyhow::Error) -> &StorageError {
    error.downcast_ref::<StorageError>().expect("storage error")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = memory().await;
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("deadlines.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn submission_deadline_is_derived_from_processing_time() {
    let storage = memory().await;
    let filing = storage
        .create_project_type(submission_type("Filing", 5))
        .await
        .expect("type");

    let mut new_project = draft("Annual return", filing.id);
    new_project.submit_date = Some(at(2));
    new_project.deadline_date = Some(at(28));
    let project = storage.create_project(&new_project, at(1)).await.expect("project");

    assert_eq!(project.type_category, ProjectCategory::Submission);
    assert_eq!(project.status, ProjectStatus::Active);
    assert_eq!(project.submit_date, Some(at(2)));
    assert_eq!(project.deadline_date, Some(at(7)));
    assert_eq!(project.type_name, "Filing");
}

#[tokio::test]
async fn deadline_projects_default_submit_date_to_now() {
    let storage = memory().await;
    let permit = storage.create_project_type(deadline_type("Permit")).await.expect("type");
    assert_eq!(permit.default_processing_days, 0);

    let mut new_project = draft("Renewal", permit.id);
    new_project.deadline_date = Some(at(20));
    let project = storage.create_project(&new_project, at(3)).await.expect("project");
    assert_eq!(project.submit_date, Some(at(3)));
    assert_eq!(project.deadline_date, Some(at(20)));

    let missing = storage
        .create_project(&draft("No date", permit.id), at(3))
        .await
        .expect_err("deadline required");
    assert!(matches!(storage_error(&missing), StorageError::Invalid(_)));
}

#[tokio::test]
async fn required_employee_must_exist_and_carry_tag() {
    let storage = memory().await;
    let reviewer = storage.create_tag("reviewer").await.expect("tag");
    let tagged = storage
        .create_employee(&NewEmployee {
            name: "Ines".into(),
            tag_ids: vec![reviewer.id],
        })
        .await
        .expect("employee");
    let untagged = storage
        .create_employee(&NewEmployee {
            name: "Olu".into(),
            tag_ids: vec![],
        })
        .await
        .expect("employee");

    let review = storage
        .create_project_type(NewProjectType {
            requires_employee: true,
            required_tag_id: Some(reviewer.id),
            ..deadline_type("Review")
        })
        .await
        .expect("type");

    let mut new_project = draft("Contract review", review.id);
    new_project.deadline_date = Some(at(15));

    let error = storage
        .create_project(&new_project, at(1))
        .await
        .expect_err("employee required");
    assert!(matches!(storage_error(&error), StorageError::Invalid(_)));

    new_project.employee_id = Some(untagged.id);
    let error = storage
        .create_project(&new_project, at(1))
        .await
        .expect_err("tag required");
    assert!(matches!(storage_error(&error), StorageError::Invalid(_)));

    new_project.employee_id = Some(tagged.id);
    let project = storage.create_project(&new_project, at(1)).await.expect("project");
    assert_eq!(project.assigned_employee_name.as_deref(), Some("Ines"));
    assert_eq!(project.employee_id, Some(tagged.id));
}

#[tokio::test]
async fn employee_is_dropped_when_type_does_not_need_one() {
    let storage = memory().await;
    let employee = storage
        .create_employee(&NewEmployee {
            name: "Mika".into(),
            tag_ids: vec![],
        })
        .await
        .expect("employee");
    let filing = storage
        .create_project_type(submission_type("Filing", 2))
        .await
        .expect("type");
    let mut new_project = draft("Memo", filing.id);
    new_project.submit_date = Some(at(4));
    new_project.employee_id = Some(employee.id);

    let project = storage.create_project(&new_project, at(4)).await.expect("project");
    assert_eq!(project.employee_id, None);
    assert_eq!(project.assigned_employee_name, None);
}

#[tokio::test]
async fn mark_completed_archives_once() {
    let storage = memory().await;
    let filing = storage
        .create_project_type(submission_type("Filing", 1))
        .await
        .expect("type");
    let mut new_project = draft("Letter", filing.id);
    new_project.submit_date = Some(at(5));
    let project = storage.create_project(&new_project, at(5)).await.expect("project");

    let completed = storage
        .mark_project_completed(project.id, at(6))
        .await
        .expect("complete");
    assert_eq!(completed.status, ProjectStatus::Archived);
    assert_eq!(completed.completion_date, Some(at(6)));

    let again = storage
        .mark_project_completed(project.id, at(7))
        .await
        .expect_err("already archived");
    assert!(matches!(storage_error(&again), StorageError::Conflict(_)));

    let missing = storage
        .mark_project_completed(ProjectId(999), at(7))
        .await
        .expect_err("unknown");
    assert!(matches!(
        storage_error(&missing),
        StorageError::NotFound { entity: "project", id: 999 }
    ));
}

#[tokio::test]
async fn update_recomputes_deadline_and_delete_removes_row() {
    let storage = memory().await;
    let filing = storage
        .create_project_type(submission_type("Filing", 3))
        .await
        .expect("type");
    let mut new_project = draft("Draft", filing.id);
    new_project.submit_date = Some(at(1));
    let project = storage.create_project(&new_project, at(1)).await.expect("project");

    new_project.name = "Final".into();
    new_project.submit_date = Some(at(10));
    let updated = storage
        .update_project(project.id, &new_project, at(2))
        .await
        .expect("update");
    assert_eq!(updated.name, "Final");
    assert_eq!(updated.deadline_date, Some(at(10) + Duration::days(3)));

    assert!(storage.delete_project(project.id).await.expect("delete"));
    assert!(!storage.delete_project(project.id).await.expect("delete again"));
    assert!(storage.list_projects().await.expect("list").is_empty());
}

#[tokio::test]
async fn project_types_in_use_cannot_be_deleted() {
    let storage = memory().await;
    let permit = storage.create_project_type(deadline_type("Permit")).await.expect("type");
    let mut new_project = draft("Renewal", permit.id);
    new_project.deadline_date = Some(at(9));
    let project = storage.create_project(&new_project, at(1)).await.expect("project");

    let error = storage
        .delete_project_type(permit.id)
        .await
        .expect_err("in use");
    assert!(matches!(storage_error(&error), StorageError::Conflict(_)));

    storage.delete_project(project.id).await.expect("delete project");
    assert!(storage.delete_project_type(permit.id).await.expect("delete type"));
}

#[tokio::test]
async fn duplicate_tags_and_channels_conflict() {
    let storage = memory().await;
    storage.create_tag("legal").await.expect("tag");
    let error = storage.create_tag("legal").await.expect_err("duplicate");
    assert!(matches!(storage_error(&error), StorageError::Conflict(_)));

    let channel = NewChannel {
        name: "alerts".into(),
        external_id: "1234".into(),
    };
    storage.create_channel(&channel).await.expect("channel");
    let error = storage.create_channel(&channel).await.expect_err("duplicate");
    assert!(matches!(storage_error(&error), StorageError::Conflict(_)));
    assert_eq!(storage.list_channels().await.expect("channels").len(), 1);
}

#[tokio::test]
async fn employee_tags_can_be_replaced() {
    let storage = memory().await;
    let first = storage.create_tag("first").await.expect("tag");
    let second = storage.create_tag("second").await.expect("tag");
    let employee = storage
        .create_employee(&NewEmployee {
            name: "Sam".into(),
            tag_ids: vec![first.id],
        })
        .await
        .expect("employee");

    storage
        .set_employee_tags(employee.id, &[second.id, second.id])
        .await
        .expect("set tags");
    let reloaded = storage
        .get_employee(employee.id)
        .await
        .expect("get")
        .expect("employee");
    assert_eq!(reloaded.tag_ids, vec![second.id]);

    let error = storage
        .set_employee_tags(EmployeeId(77), &[first.id])
        .await
        .expect_err("unknown employee");
    assert!(matches!(storage_error(&error), StorageError::NotFound { .. }));
}

#[tokio::test]
async fn unknown_tag_on_new_employee_is_not_found_and_rolls_back() {
    let storage = memory().await;
    let error = storage
        .create_employee(&NewEmployee {
            name: "Robin".into(),
            tag_ids: vec![TagId(404)],
        })
        .await
        .expect_err("unknown tag");
    assert!(matches!(
        storage_error(&error),
        StorageError::NotFound { entity: "tag", id: 404 }
    ));
    assert!(storage.list_employees().await.expect("employees").is_empty());
}

#[tokio::test]
async fn unknown_tag_on_existing_employee_keeps_previous_tags() {
    let storage = memory().await;
    let tag = storage.create_tag("kept").await.expect("tag");
    let employee = storage
        .create_employee(&NewEmployee {
            name: "Robin".into(),
            tag_ids: vec![tag.id],
        })
        .await
        .expect("employee");

    let error = storage
        .set_employee_tags(employee.id, &[TagId(404)])
        .await
        .expect_err("unknown tag");
    assert!(matches!(
        storage_error(&error),
        StorageError::NotFound { entity: "tag", id: 404 }
    ));
    let reloaded = storage
        .get_employee(employee.id)
        .await
        .expect("get")
        .expect("employee");
    assert_eq!(reloaded.tag_ids, vec![tag.id]);
}

#[test]
fn only_foreign_key_failures_become_not_found() {
    let error = missing_reference_or(sqlx::Error::PoolClosed, "tag", 9);
    assert!(error.downcast_ref::<StorageError>().is_none());
    assert!(matches!(
        error.root_cause().downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::PoolClosed)
    ));
}

#[tokio::test]
async fn processing_days_past_the_limit_are_rejected() {
    let storage = memory().await;
    let error = storage
        .create_project_type(submission_type("Huge", 200_000_000))
        .await
        .expect_err("too many days");
    assert!(matches!(storage_error(&error), StorageError::Invalid(_)));
    assert!(storage.list_project_types().await.expect("types").is_empty());

    let filing = storage
        .create_project_type(submission_type("Filing", 5))
        .await
        .expect("type");
    let error = storage
        .update_project_type(filing.id, submission_type("Filing", i64::MAX))
        .await
        .expect_err("too many days");
    assert!(matches!(storage_error(&error), StorageError::Invalid(_)));
    let reloaded = storage
        .get_project_type(filing.id)
        .await
        .expect("get")
        .expect("type");
    assert_eq!(reloaded.default_processing_days, 5);
}

#[tokio::test]
async fn out_of_range_stored_deadline_is_invalid_not_a_panic() {
    let storage = memory().await;
    // Rows written before the processing-days limit existed.
    let type_id: i64 = sqlx::query_scalar(
        "INSERT INTO project_types
            (name, category, default_processing_days, requires_employee)
         VALUES ('Legacy', 'submission', 200000000, 0)
         RETURNING id",
    )
    .fetch_one(&storage.pool)
    .await
    .expect("legacy type");

    let mut new_project = draft("Overflow", ProjectTypeId(type_id));
    new_project.submit_date = Some(at(1));
    let error = storage
        .create_project(&new_project, at(1))
        .await
        .expect_err("out of range");
    assert!(matches!(storage_error(&error), StorageError::Invalid(_)));
    assert!(storage.list_projects().await.expect("projects").is_empty());
}
