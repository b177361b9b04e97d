//! Events the host publishes to whoever renders it.

use std::sync::Arc;

use serde::Serialize;
use shared::{
    domain::{ProjectId, ProjectRecord},
    error::ApiError,
};

use crate::{
    error::RepositoryError,
    form::{Catalog, FormErrors, ProjectForm},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user-facing message about a finished operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub error: Option<ApiError>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: &RepositoryError) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            error: Some(error.to_api_error()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmAction {
    Delete,
    MarkCompleted,
}

impl ConfirmAction {
    pub fn title(self) -> &'static str {
        match self {
            Self::Delete => "Delete Project",
            Self::MarkCompleted => "Mark Project as Completed",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Delete => {
                "Are you sure you want to delete this project? This action cannot be undone."
            }
            Self::MarkCompleted => "Are you sure you want to mark this project as completed?",
        }
    }
}

/// A destructive row action waiting for the user's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingConfirmation {
    pub action: ConfirmAction,
    pub project_id: ProjectId,
}

impl PendingConfirmation {
    pub fn title(&self) -> &'static str {
        self.action.title()
    }

    pub fn message(&self) -> &'static str {
        self.action.message()
    }
}

#[derive(Debug, Clone)]
pub enum HostEvent {
    ProjectsReplaced {
        generation: u64,
        projects: Arc<[ProjectRecord]>,
    },
    CatalogLoaded(Catalog),
    Notice(Notice),
    ConfirmationRequested(PendingConfirmation),
    ConfirmationCleared,
    EditRequested(ProjectForm),
    FormRejected(FormErrors),
}
