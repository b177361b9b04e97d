use serde::{Deserialize, Serialize};

use crate::dates::MAX_PROCESSING_DAYS;
use crate::domain::{ChannelId, EmployeeId, ProjectCategory, ProjectTypeId, TagId, Timestamp};

/// Validated project payload for create and update calls.
///
/// For submission types `deadline_date` may be left empty; the repository
/// derives it from the submit date and the type's processing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    pub type_id: ProjectTypeId,
    pub submit_date: Option<Timestamp>,
    pub deadline_date: Option<Timestamp>,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProjectType {
    pub name: String,
    pub category: ProjectCategory,
    pub default_processing_days: i64,
    #[serde(default)]
    pub requires_employee: bool,
    #[serde(default)]
    pub required_tag_id: Option<TagId>,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
}

impl NewProjectType {
    /// Deadline types carry no processing time.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        if self.category == ProjectCategory::Deadline {
            self.default_processing_days = 0;
        }
        self.default_processing_days = self.default_processing_days.max(0);
        self
    }

    /// Rejects processing times no deadline could be derived from.
    pub fn validate_processing_days(&self) -> Result<(), String> {
        if self.default_processing_days > MAX_PROCESSING_DAYS {
            return Err(format!(
                "processing days must be at most {MAX_PROCESSING_DAYS}, got {}",
                self.default_processing_days
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChannel {
    pub name: String,
    pub external_id: String,
}
