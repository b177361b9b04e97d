//! Host commands queued from the UI to the host worker.

use grid::RowAction;
use shared::domain::ProjectId;

use crate::form::ProjectForm;

#[derive(Debug, Clone)]
pub enum HostCommand {
    Refresh,
    LoadCatalog,
    RowAction(RowAction),
    Confirm,
    Cancel,
    Submit(ProjectForm),
    Delete { project_id: ProjectId },
    MarkCompleted { project_id: ProjectId },
}

impl HostCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::LoadCatalog => "load_catalog",
            Self::RowAction(_) => "row_action",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Submit(_) => "submit",
            Self::Delete { .. } => "delete",
            Self::MarkCompleted { .. } => "mark_completed",
        }
    }
}
