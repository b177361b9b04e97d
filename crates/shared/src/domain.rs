use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All instants are UTC.
pub type Timestamp = DateTime<Utc>;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ProjectId);
id_newtype!(ProjectTypeId);
id_newtype!(EmployeeId);
id_newtype!(TagId);
id_newtype!(ChannelId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectCategory {
    Submission,
    Deadline,
}

impl ProjectCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Submission => "submission",
            Self::Deadline => "deadline",
        }
    }
}

impl fmt::Display for ProjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProjectCategory {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submission" => Ok(Self::Submission),
            "deadline" => Ok(Self::Deadline),
            _ => Err(ParseEnumError {
                kind: "project category",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Archived,
}

impl ProjectStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProjectStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseEnumError {
                kind: "project status",
                value: value.to_string(),
            }),
        }
    }
}

/// A project as delivered to list views. Read-only for the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
    pub type_id: ProjectTypeId,
    pub type_name: String,
    pub type_category: ProjectCategory,
    pub status: ProjectStatus,
    pub submit_date: Option<Timestamp>,
    pub deadline_date: Option<Timestamp>,
    pub completion_date: Option<Timestamp>,
    pub employee_id: Option<EmployeeId>,
    pub assigned_employee_name: Option<String>,
}

impl ProjectRecord {
    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }
}

/// Category configuration applied to projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectType {
    pub id: ProjectTypeId,
    pub name: String,
    pub category: ProjectCategory,
    /// Always 0 for deadline types.
    pub default_processing_days: i64,
    pub requires_employee: bool,
    pub required_tag_id: Option<TagId>,
    pub channel_id: Option<ChannelId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub tag_ids: Vec<TagId>,
}

impl Employee {
    pub fn has_tag(&self, tag_id: TagId) -> bool {
        self.tag_ids.contains(&tag_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeTag {
    pub id: TagId,
    pub name: String,
}

/// Notification target attached to a project type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub external_id: String,
}
