//! Repository seams between the host and whatever holds project data.

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{Employee, ProjectId, ProjectRecord, ProjectType},
    protocol::ProjectDraft,
};
use storage::Storage;
use tracing::debug;

use crate::error::RepositoryError;

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<ProjectRecord>, RepositoryError>;
    async fn create(&self, draft: &ProjectDraft) -> Result<ProjectRecord, RepositoryError>;
    async fn update(
        &self,
        project_id: ProjectId,
        draft: &ProjectDraft,
    ) -> Result<ProjectRecord, RepositoryError>;
    /// Fails with `NotFound` when nothing was deleted.
    async fn delete(&self, project_id: ProjectId) -> Result<(), RepositoryError>;
    async fn mark_completed(
        &self,
        project_id: ProjectId,
    ) -> Result<ProjectRecord, RepositoryError>;
}

/// Read access to the catalog the project form draws from.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn project_types(&self) -> Result<Vec<ProjectType>, RepositoryError>;
    async fn employees(&self) -> Result<Vec<Employee>, RepositoryError>;
}

#[async_trait]
impl ProjectRepository for Storage {
    async fn fetch_all(&self) -> Result<Vec<ProjectRecord>, RepositoryError> {
        let projects = self.list_projects().await?;
        debug!(count = projects.len(), "fetched projects");
        Ok(projects)
    }

    async fn create(&self, draft: &ProjectDraft) -> Result<ProjectRecord, RepositoryError> {
        Ok(self.create_project(draft, Utc::now()).await?)
    }

    async fn update(
        &self,
        project_id: ProjectId,
        draft: &ProjectDraft,
    ) -> Result<ProjectRecord, RepositoryError> {
        Ok(self.update_project(project_id, draft, Utc::now()).await?)
    }

    async fn delete(&self, project_id: ProjectId) -> Result<(), RepositoryError> {
        if self.delete_project(project_id).await? {
            Ok(())
        } else {
            Err(RepositoryError::NotFound {
                entity: "project",
                id: project_id.0,
            })
        }
    }

    async fn mark_completed(
        &self,
        project_id: ProjectId,
    ) -> Result<ProjectRecord, RepositoryError> {
        Ok(self.mark_project_completed(project_id, Utc::now()).await?)
    }
}

#[async_trait]
impl CatalogRepository for Storage {
    async fn project_types(&self) -> Result<Vec<ProjectType>, RepositoryError> {
        Ok(self.list_project_types().await?)
    }

    async fn employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self.list_employees().await?)
    }
}
