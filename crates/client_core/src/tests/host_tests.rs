use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone};
use crossbeam_channel::{unbounded, Receiver};
use shared::{
    domain::{Employee, ProjectCategory, ProjectStatus, ProjectType, ProjectTypeId},
    protocol::ProjectDraft,
};

use super::*;

fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).single().expect("date")
}

const VISA: ProjectTypeId = ProjectTypeId(1);

/// In-memory repository with one-shot failure injection.
#[derive(Default)]
struct FakeRepository {
    rows: Mutex<Vec<ProjectRecord>>,
    fail_next: Mutex<Option<RepositoryError>>,
    fetches: Mutex<usize>,
}

impl FakeRepository {
    fn with_rows(rows: Vec<ProjectRecord>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    fn fail_next(&self, error: RepositoryError) {
        *self.fail_next.lock().expect("lock") = Some(error);
    }

    fn injected(&self) -> Result<(), RepositoryError> {
        match self.fail_next.lock().expect("lock").take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fetches(&self) -> usize {
        *self.fetches.lock().expect("lock")
    }

    fn record_from(&self, id: ProjectId, draft: &ProjectDraft) -> ProjectRecord {
        ProjectRecord {
            id,
            name: draft.name.clone(),
            type_id: draft.type_id,
            type_name: "Visa".to_string(),
            type_category: ProjectCategory::Submission,
            status: ProjectStatus::Active,
            submit_date: draft.submit_date,
            deadline_date: draft.deadline_date,
            completion_date: None,
            employee_id: draft.employee_id,
            assigned_employee_name: None,
        }
    }
}

#[async_trait]
impl ProjectRepository for FakeRepository {
    async fn fetch_all(&self) -> Result<Vec<ProjectRecord>, RepositoryError> {
        self.injected()?;
        *self.fetches.lock().expect("lock") += 1;
        Ok(self.rows.lock().expect("lock").clone())
    }

    async fn create(&self, draft: &ProjectDraft) -> Result<ProjectRecord, RepositoryError> {
        self.injected()?;
        let mut rows = self.rows.lock().expect("lock");
        let id = ProjectId(rows.iter().map(|row| row.id.0).max().unwrap_or(0) + 1);
        let record = self.record_from(id, draft);
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        project_id: ProjectId,
        draft: &ProjectDraft,
    ) -> Result<ProjectRecord, RepositoryError> {
        self.injected()?;
        let mut rows = self.rows.lock().expect("lock");
        let slot = rows
            .iter_mut()
            .find(|row| row.id == project_id)
            .ok_or(RepositoryError::NotFound {
                entity: "project",
                id: project_id.0,
            })?;
        *slot = self.record_from(project_id, draft);
        Ok(slot.clone())
    }

    async fn delete(&self, project_id: ProjectId) -> Result<(), RepositoryError> {
        self.injected()?;
        let mut rows = self.rows.lock().expect("lock");
        let before = rows.len();
        rows.retain(|row| row.id != project_id);
        if rows.len() == before {
            return Err(RepositoryError::NotFound {
                entity: "project",
                id: project_id.0,
            });
        }
        Ok(())
    }

    async fn mark_completed(
        &self,
        project_id: ProjectId,
    ) -> Result<ProjectRecord, RepositoryError> {
        self.injected()?;
        let mut rows = self.rows.lock().expect("lock");
        let slot = rows
            .iter_mut()
            .find(|row| row.id == project_id)
            .ok_or(RepositoryError::NotFound {
                entity: "project",
                id: project_id.0,
            })?;
        slot.status = ProjectStatus::Archived;
        slot.completion_date = Some(now());
        Ok(slot.clone())
    }
}

#[async_trait]
impl CatalogRepository for FakeRepository {
    async fn project_types(&self) -> Result<Vec<ProjectType>, RepositoryError> {
        self.injected()?;
        Ok(vec![ProjectType {
            id: VISA,
            name: "Visa".to_string(),
            category: ProjectCategory::Submission,
            default_processing_days: 10,
            requires_employee: false,
            required_tag_id: None,
            channel_id: None,
        }])
    }

    async fn employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        self.injected()?;
        Ok(Vec::new())
    }
}

fn active(id: i64, deadline_in_days: i64) -> ProjectRecord {
    ProjectRecord {
        id: ProjectId(id),
        name: format!("project-{id}"),
        type_id: VISA,
        type_name: "Visa".to_string(),
        type_category: ProjectCategory::Submission,
        status: ProjectStatus::Active,
        submit_date: Some(now()),
        deadline_date: Some(now() + Duration::days(deadline_in_days)),
        completion_date: None,
        employee_id: None,
        assigned_employee_name: None,
    }
}

fn host(rows: Vec<ProjectRecord>) -> (ProjectsHost<FakeRepository>, Receiver<HostEvent>) {
    let (tx, rx) = unbounded();
    let host = ProjectsHost::new(FakeRepository::with_rows(rows), tx).with_clock(now);
    (host, rx)
}

fn notices(rx: &Receiver<HostEvent>) -> Vec<Notice> {
    rx.try_iter()
        .filter_map(|event| match event {
            HostEvent::Notice(notice) => Some(notice),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn refresh_replaces_snapshot_and_publishes_generation() {
    let (mut host, rx) = host(vec![active(1, 3), active(2, 1)]);
    let generation = host.refresh().await.expect("refresh");

    assert_eq!(generation, 1);
    assert_eq!(host.store().snapshot().len(), 2);
    match rx.try_recv().expect("event") {
        HostEvent::ProjectsReplaced {
            generation,
            projects,
        } => {
            assert_eq!(generation, 1);
            assert_eq!(projects.len(), 2);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let grid = host.grid(Partition::Active);
    let order: Vec<i64> = grid.sorted_rows().iter().map(|row| row.id.0).collect();
    assert_eq!(order, vec![2, 1], "active grid defaults to deadline ascending");
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot_and_notifies() {
    let (mut host, rx) = host(vec![active(1, 3)]);
    host.refresh().await.expect("refresh");
    host.repository()
        .fail_next(RepositoryError::Unavailable("offline".to_string()));

    let err = host.refresh().await.expect_err("offline");
    assert_eq!(err.code(), shared::error::ErrorCode::Unavailable);
    assert_eq!(host.store().generation(), 1);

    let notices = notices(&rx);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert_eq!(notices[0].message, "Failed to load projects");
}

#[tokio::test]
async fn delete_waits_for_confirmation_then_refetches() {
    let (mut host, rx) = host(vec![active(1, 3), active(2, 5)]);
    host.refresh().await.expect("refresh");

    let grid = host.grid(Partition::Active);
    let action = grid
        .request_action(RowActionKind::Delete, ProjectId(1))
        .expect("delete offered");
    assert!(host.handle_row_action(action).is_none());

    let pending = *host.pending_confirmation().expect("pending");
    assert_eq!(pending.title(), "Delete Project");
    assert_eq!(host.repository().fetches(), 1, "nothing ran yet");

    assert!(host.confirm().await.expect("confirm"));
    assert!(host.pending_confirmation().is_none());
    assert_eq!(host.repository().fetches(), 2);
    assert_eq!(host.store().snapshot().len(), 1);

    let messages: Vec<String> = notices(&rx).into_iter().map(|n| n.message).collect();
    assert_eq!(messages, vec!["Project deleted successfully".to_string()]);
}

#[tokio::test]
async fn cancel_discards_pending_action() {
    let (mut host, _rx) = host(vec![active(1, 3)]);
    host.refresh().await.expect("refresh");
    host.handle_row_action(RowAction {
        kind: RowActionKind::MarkCompleted,
        project_id: ProjectId(1),
    });

    assert!(host.cancel());
    assert!(!host.cancel());
    assert!(!host.confirm().await.expect("nothing pending"));
    assert_eq!(host.partition_rows(Partition::Active).len(), 1);
}

#[tokio::test]
async fn mark_completed_moves_row_to_completed_partition() {
    let (mut host, rx) = host(vec![active(1, 3), active(2, 5)]);
    host.refresh().await.expect("refresh");
    host.handle_row_action(RowAction {
        kind: RowActionKind::MarkCompleted,
        project_id: ProjectId(2),
    });
    host.confirm().await.expect("confirm");

    assert_eq!(host.partition_rows(Partition::Active).len(), 1);
    let completed = host.partition_rows(Partition::Completed);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].completion_date, Some(now()));
    assert!(notices(&rx)
        .iter()
        .any(|notice| notice.message == "Project marked as completed"));
}

#[tokio::test]
async fn failed_mutation_notifies_without_refetch() {
    let (mut host, rx) = host(vec![active(1, 3)]);
    host.refresh().await.expect("refresh");
    host.repository()
        .fail_next(RepositoryError::Conflict("already archived".to_string()));

    let err = host.mark_completed(ProjectId(1)).await.expect_err("conflict");
    assert_eq!(err.code(), shared::error::ErrorCode::Conflict);
    assert_eq!(host.repository().fetches(), 1);

    let notices = notices(&rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Failed to mark project as completed");
    assert_eq!(
        notices[0].error.as_ref().map(|error| error.code),
        Some(shared::error::ErrorCode::Conflict)
    );
}

#[tokio::test]
async fn edit_action_prefills_form_and_submit_updates() {
    let (mut host, rx) = host(vec![active(1, 3)]);
    host.refresh().await.expect("refresh");
    host.load_catalog().await.expect("catalog");

    let mut form = host
        .handle_row_action(RowAction {
            kind: RowActionKind::Edit,
            project_id: ProjectId(1),
        })
        .expect("form");
    assert_eq!(form.editing, Some(ProjectId(1)));
    assert_eq!(form.name, "project-1");

    form.name = "renamed".to_string();
    let saved = host.submit(&form).await.expect("saved");
    assert_eq!(saved.name, "renamed");
    assert_eq!(saved.deadline_date, Some(now() + Duration::days(10)));
    assert_eq!(host.store().snapshot()[0].name, "renamed");
    assert!(rx
        .try_iter()
        .any(|event| matches!(event, HostEvent::EditRequested(_))));
}

#[tokio::test]
async fn invalid_form_is_rejected_before_repository() {
    let (mut host, rx) = host(Vec::new());
    host.load_catalog().await.expect("catalog");

    let err = host
        .submit(&ProjectForm::for_create())
        .await
        .expect_err("invalid");
    assert!(matches!(err, SubmitError::Invalid(ref errors) if errors.len() == 2));
    assert!(rx
        .try_iter()
        .any(|event| matches!(event, HostEvent::FormRejected(_))));
    assert!(host.store().snapshot().is_empty());
}

#[tokio::test]
async fn create_refetches_and_notifies() {
    let (mut host, rx) = host(Vec::new());
    host.load_catalog().await.expect("catalog");
    let mut form = ProjectForm::for_create();
    form.name = "New visa".to_string();
    form.type_id = Some(VISA);
    form.submit_date = Some(now());
    let form = form;

    let created = host.submit(&form).await.expect("created");
    assert_eq!(created.id, ProjectId(1));
    assert_eq!(host.store().generation(), 1);
    assert_eq!(
        notices(&rx)
            .into_iter()
            .map(|notice| notice.message)
            .collect::<Vec<_>>(),
        vec!["Project created successfully".to_string()]
    );
}
