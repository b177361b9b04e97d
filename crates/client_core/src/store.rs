//! Latest project snapshot and the partitions the pages render from it.

use std::sync::Arc;

use grid::{GridActions, GridController, GridDefaults};
use serde::{Deserialize, Serialize};
use shared::domain::{ProjectCategory, ProjectRecord, ProjectStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Active,
    ActiveSubmission,
    ActiveDeadline,
    Completed,
}

impl Partition {
    pub const ALL: [Partition; 4] = [
        Partition::Active,
        Partition::ActiveSubmission,
        Partition::ActiveDeadline,
        Partition::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ActiveSubmission => "submission",
            Self::ActiveDeadline => "deadline",
            Self::Completed => "completed",
        }
    }

    pub fn contains(self, row: &ProjectRecord) -> bool {
        match self {
            Self::Active => row.status == ProjectStatus::Active,
            Self::ActiveSubmission => {
                row.status == ProjectStatus::Active
                    && row.type_category == ProjectCategory::Submission
            }
            Self::ActiveDeadline => {
                row.status == ProjectStatus::Active
                    && row.type_category == ProjectCategory::Deadline
            }
            Self::Completed => row.status == ProjectStatus::Archived,
        }
    }

    pub fn select(self, rows: &[ProjectRecord]) -> Arc<[ProjectRecord]> {
        rows.iter().filter(|row| self.contains(row)).cloned().collect()
    }

    pub fn grid_defaults(self) -> GridDefaults {
        match self {
            Self::Completed => GridDefaults::completed(),
            _ => GridDefaults::active(),
        }
    }

    /// Archived rows can only be deleted.
    pub fn grid_actions(self) -> GridActions {
        match self {
            Self::Completed => GridActions::delete_only(),
            _ => GridActions::all(),
        }
    }

    pub fn grid(self, rows: &[ProjectRecord]) -> GridController {
        self.grid_with_defaults(rows, &self.grid_defaults())
    }

    pub fn grid_with_defaults(
        self,
        rows: &[ProjectRecord],
        defaults: &GridDefaults,
    ) -> GridController {
        GridController::with_rows(defaults, self.grid_actions(), self.select(rows))
    }
}

impl std::str::FromStr for Partition {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|partition| partition.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown view '{value}'"))
    }
}

/// Holds the most recent fetch. Every replacement bumps `generation`.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    snapshot: Arc<[ProjectRecord]>,
    generation: u64,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self {
            snapshot: Arc::from(Vec::new()),
            generation: 0,
        }
    }
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, rows: Vec<ProjectRecord>) -> u64 {
        self.snapshot = Arc::from(rows);
        self.generation += 1;
        self.generation
    }

    pub fn snapshot(&self) -> Arc<[ProjectRecord]> {
        Arc::clone(&self.snapshot)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.generation > 0
    }

    pub fn partition(&self, partition: Partition) -> Arc<[ProjectRecord]> {
        partition.select(&self.snapshot)
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
