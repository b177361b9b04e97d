use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Column identifiers in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnId {
    Name,
    Type,
    Category,
    Status,
    SubmitDate,
    DeadlineDate,
    CompletionDate,
    Employee,
    Actions,
}

impl ColumnId {
    pub const ALL: [ColumnId; 9] = [
        ColumnId::Name,
        ColumnId::Type,
        ColumnId::Category,
        ColumnId::Status,
        ColumnId::SubmitDate,
        ColumnId::DeadlineDate,
        ColumnId::CompletionDate,
        ColumnId::Employee,
        ColumnId::Actions,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::Category => "category",
            Self::Status => "status",
            Self::SubmitDate => "submit_date",
            Self::DeadlineDate => "deadline_date",
            Self::CompletionDate => "completion_date",
            Self::Employee => "employee",
            Self::Actions => "actions",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Type => "Type",
            Self::Category => "Category",
            Self::Status => "Status",
            Self::SubmitDate => "Submit Date",
            Self::DeadlineDate => "Deadline",
            Self::CompletionDate => "Completion",
            Self::Employee => "Employee",
            Self::Actions => "",
        }
    }

    /// The row-actions column always stays visible.
    pub fn is_hideable(self) -> bool {
        self != Self::Actions
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ColumnId {
    type Err = String;

    /// Accepts snake_case ids and the camelCase accessor names used by older
    /// saved views (`deadlineDate`, `employee.name`, ...).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let column = match value.trim() {
            "name" => Self::Name,
            "type" | "type.name" | "type_name" => Self::Type,
            "category" | "type.category" | "type_category" => Self::Category,
            "status" => Self::Status,
            "submit_date" | "submitDate" | "submit" => Self::SubmitDate,
            "deadline_date" | "deadlineDate" | "deadline" => Self::DeadlineDate,
            "completion_date" | "completionDate" | "completion" => Self::CompletionDate,
            "employee" | "employee.name" | "employee_name" => Self::Employee,
            "actions" => Self::Actions,
            other => return Err(format!("unknown column '{other}'")),
        };
        Ok(column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortIndicator {
    /// Sortable but not the active sort column.
    Unsorted,
    Ascending,
    Descending,
    NotSortable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub id: ColumnId,
    pub label: &'static str,
    pub visible: bool,
    pub hideable: bool,
    pub sortable: bool,
    pub sort_indicator: SortIndicator,
}
