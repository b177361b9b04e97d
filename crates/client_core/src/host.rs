//! The projects page host: owns the snapshot, runs mutations through the
//! repository and refetches after every successful one.

use std::sync::Arc;

use chrono::Utc;
use crossbeam_channel::Sender;
use grid::{GridController, GridDefaults, RowAction, RowActionKind};
use shared::domain::{ProjectId, ProjectRecord, Timestamp};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::RepositoryError,
    events::{ConfirmAction, HostEvent, Notice, PendingConfirmation},
    form::{Catalog, FormErrors, ProjectForm},
    repository::{CatalogRepository, ProjectRepository},
    store::{Partition, ProjectStore},
};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("project form rejected: {0}")]
    Invalid(FormErrors),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct ProjectsHost<R> {
    repository: R,
    store: ProjectStore,
    catalog: Catalog,
    pending: Option<PendingConfirmation>,
    events: Sender<HostEvent>,
    clock: fn() -> Timestamp,
}

impl<R> ProjectsHost<R>
where
    R: ProjectRepository + CatalogRepository,
{
    pub fn new(repository: R, events: Sender<HostEvent>) -> Self {
        Self {
            repository,
            store: ProjectStore::new(),
            catalog: Catalog::default(),
            pending: None,
            events,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn now(&self) -> Timestamp {
        (self.clock)()
    }

    pub fn partition_rows(&self, partition: Partition) -> Arc<[ProjectRecord]> {
        self.store.partition(partition)
    }

    /// A fresh grid over the current snapshot of `partition`.
    pub fn grid(&self, partition: Partition) -> GridController {
        partition.grid(&self.store.snapshot())
    }

    pub fn grid_with_defaults(
        &self,
        partition: Partition,
        defaults: &GridDefaults,
    ) -> GridController {
        partition.grid_with_defaults(&self.store.snapshot(), defaults)
    }

    pub fn pending_confirmation(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    pub async fn refresh(&mut self) -> Result<u64, RepositoryError> {
        match self.repository.fetch_all().await {
            Ok(rows) => {
                let generation = self.store.replace(rows);
                debug!(generation, "project snapshot replaced");
                self.publish(HostEvent::ProjectsReplaced {
                    generation,
                    projects: self.store.snapshot(),
                });
                Ok(generation)
            }
            Err(error) => {
                warn!(%error, "failed to load projects");
                self.publish(HostEvent::Notice(Notice::failure(
                    "Failed to load projects",
                    &error,
                )));
                Err(error)
            }
        }
    }

    pub async fn load_catalog(&mut self) -> Result<(), RepositoryError> {
        let loaded = async {
            let project_types = self.repository.project_types().await?;
            let employees = self.repository.employees().await?;
            Ok::<_, RepositoryError>(Catalog {
                project_types,
                employees,
            })
        }
        .await;
        match loaded {
            Ok(catalog) => {
                self.catalog = catalog.clone();
                self.publish(HostEvent::CatalogLoaded(catalog));
                Ok(())
            }
            Err(error) => {
                warn!(%error, "failed to load catalog");
                self.publish(HostEvent::Notice(Notice::failure(
                    "Failed to load project types and employees",
                    &error,
                )));
                Err(error)
            }
        }
    }

    /// Edit opens a prefilled form; delete and mark-completed wait for
    /// `confirm`.
    pub fn handle_row_action(&mut self, action: RowAction) -> Option<ProjectForm> {
        debug!(kind = ?action.kind, project_id = %action.project_id, "row action requested");
        match action.kind {
            RowActionKind::Edit => {
                let snapshot = self.store.snapshot();
                let record = snapshot.iter().find(|row| row.id == action.project_id)?;
                let form = ProjectForm::for_edit(record);
                self.publish(HostEvent::EditRequested(form.clone()));
                Some(form)
            }
            RowActionKind::Delete => {
                self.request_confirmation(ConfirmAction::Delete, action.project_id);
                None
            }
            RowActionKind::MarkCompleted => {
                self.request_confirmation(ConfirmAction::MarkCompleted, action.project_id);
                None
            }
        }
    }

    /// Runs the pending action. `Ok(false)` when nothing was pending.
    pub async fn confirm(&mut self) -> Result<bool, RepositoryError> {
        let Some(pending) = self.pending.take() else {
            return Ok(false);
        };
        self.publish(HostEvent::ConfirmationCleared);
        match pending.action {
            ConfirmAction::Delete => self.delete(pending.project_id).await?,
            ConfirmAction::MarkCompleted => {
                self.mark_completed(pending.project_id).await?;
            }
        }
        Ok(true)
    }

    pub fn cancel(&mut self) -> bool {
        let cancelled = self.pending.take().is_some();
        if cancelled {
            self.publish(HostEvent::ConfirmationCleared);
        }
        cancelled
    }

    /// Validates `form` against the loaded catalog, then creates or updates.
    pub async fn submit(&mut self, form: &ProjectForm) -> Result<ProjectRecord, SubmitError> {
        let draft = match form.validate(&self.catalog, self.now()) {
            Ok(draft) => draft,
            Err(errors) => {
                debug!(fields = errors.len(), "project form rejected");
                self.publish(HostEvent::FormRejected(errors.clone()));
                return Err(SubmitError::Invalid(errors));
            }
        };

        let record = match form.editing {
            Some(project_id) => {
                let result = self.repository.update(project_id, &draft).await;
                self.finish_mutation(
                    result,
                    "Project updated successfully",
                    "Failed to update project",
                )
                .await?
            }
            None => {
                let result = self.repository.create(&draft).await;
                self.finish_mutation(
                    result,
                    "Project created successfully",
                    "Failed to create project",
                )
                .await?
            }
        };
        info!(project_id = %record.id, "project saved");
        Ok(record)
    }

    pub async fn delete(&mut self, project_id: ProjectId) -> Result<(), RepositoryError> {
        let result = self.repository.delete(project_id).await;
        self.finish_mutation(
            result,
            "Project deleted successfully",
            "Failed to delete project",
        )
        .await
    }

    pub async fn mark_completed(
        &mut self,
        project_id: ProjectId,
    ) -> Result<ProjectRecord, RepositoryError> {
        let result = self.repository.mark_completed(project_id).await;
        self.finish_mutation(
            result,
            "Project marked as completed",
            "Failed to mark project as completed",
        )
        .await
    }

    fn request_confirmation(&mut self, action: ConfirmAction, project_id: ProjectId) {
        let pending = PendingConfirmation { action, project_id };
        self.pending = Some(pending);
        self.publish(HostEvent::ConfirmationRequested(pending));
    }

    async fn finish_mutation<T>(
        &mut self,
        result: Result<T, RepositoryError>,
        success: &str,
        failure: &str,
    ) -> Result<T, RepositoryError> {
        match result {
            Ok(value) => {
                self.publish(HostEvent::Notice(Notice::success(success)));
                if let Err(error) = self.refresh().await {
                    debug!(%error, "refetch after mutation failed");
                }
                Ok(value)
            }
            Err(error) => {
                warn!(%error, "{failure}");
                self.publish(HostEvent::Notice(Notice::failure(failure, &error)));
                Err(error)
            }
        }
    }

    fn publish(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            debug!("host event receiver dropped");
        }
    }
}

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod tests;
