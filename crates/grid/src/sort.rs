//! Per-field comparators.

use std::{cmp::Ordering, str::FromStr};

use serde::{Deserialize, Serialize};
use shared::domain::{ProjectRecord, Timestamp};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::columns::ColumnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Type,
    Category,
    Status,
    SubmitDate,
    DeadlineDate,
    CompletionDate,
    Employee,
}

impl SortField {
    pub fn column(self) -> ColumnId {
        match self {
            Self::Name => ColumnId::Name,
            Self::Type => ColumnId::Type,
            Self::Category => ColumnId::Category,
            Self::Status => ColumnId::Status,
            Self::SubmitDate => ColumnId::SubmitDate,
            Self::DeadlineDate => ColumnId::DeadlineDate,
            Self::CompletionDate => ColumnId::CompletionDate,
            Self::Employee => ColumnId::Employee,
        }
    }

    /// `None` for columns without a sort affordance.
    pub fn for_column(column: ColumnId) -> Option<Self> {
        match column {
            ColumnId::Name => Some(Self::Name),
            ColumnId::Type => Some(Self::Type),
            ColumnId::Category => Some(Self::Category),
            ColumnId::Status => Some(Self::Status),
            ColumnId::SubmitDate => Some(Self::SubmitDate),
            ColumnId::DeadlineDate => Some(Self::DeadlineDate),
            ColumnId::CompletionDate => Some(Self::CompletionDate),
            ColumnId::Employee => Some(Self::Employee),
            ColumnId::Actions => None,
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let column = ColumnId::from_str(value)?;
        Self::for_column(column).ok_or_else(|| format!("column '{column}' is not sortable"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Ascending comparison of two rows on `field`. Descending is the reverse.
pub fn compare(field: SortField, a: &ProjectRecord, b: &ProjectRecord) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::Type => a.type_name.cmp(&b.type_name),
        SortField::Category => a.type_category.label().cmp(b.type_category.label()),
        SortField::Status => a.status.label().cmp(b.status.label()),
        SortField::SubmitDate => compare_dates(a.submit_date, b.submit_date),
        SortField::DeadlineDate => compare_dates(a.deadline_date, b.deadline_date),
        SortField::CompletionDate => compare_dates(a.completion_date, b.completion_date),
        SortField::Employee => collate(
            a.assigned_employee_name.as_deref().unwrap_or_default(),
            b.assigned_employee_name.as_deref().unwrap_or_default(),
        ),
    }
}

/// Stable in-place sort; rows with equal keys keep their input order.
pub fn sort_rows(rows: &mut [&ProjectRecord], field: SortField, direction: SortDirection) {
    match direction {
        SortDirection::Ascending => rows.sort_by(|a, b| compare(field, a, b)),
        SortDirection::Descending => rows.sort_by(|a, b| compare(field, b, a)),
    }
}

/// Absent dates sort after every present date.
fn compare_dates(a: Option<Timestamp>, b: Option<Timestamp>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Multi-level collation: base letters, then accents, then case (lowercase
/// first), then code points.
pub fn collate(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| secondary_key(a).cmp(&secondary_key(b)))
        .then_with(|| tertiary_key(a).cmp(&tertiary_key(b)))
        .then_with(|| a.cmp(b))
}

fn primary_key(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn secondary_key(value: &str) -> String {
    value.nfd().flat_map(char::to_lowercase).collect()
}

fn tertiary_key(value: &str) -> Vec<bool> {
    value.nfd().map(char::is_uppercase).collect()
}

#[cfg(test)]
#[path = "tests/sort_tests.rs"]
mod tests;
