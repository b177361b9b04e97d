//! Time-to-deadline banding used for colour-coded deadline cells.

use serde::Serialize;
use shared::{
    dates::whole_days_between,
    domain::{ProjectRecord, ProjectStatus, Timestamp},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyBand {
    Overdue,
    Critical,
    Soon,
    Upcoming,
    Scheduled,
    Distant,
    /// Active row without a deadline.
    Unscheduled,
    /// Archived row; date math is not applied.
    Completed,
}

impl UrgencyBand {
    pub fn label(self) -> &'static str {
        match self {
            Self::Overdue => "overdue",
            Self::Critical => "critical",
            Self::Soon => "soon",
            Self::Upcoming => "upcoming",
            Self::Scheduled => "scheduled",
            Self::Distant => "distant",
            Self::Unscheduled => "unscheduled",
            Self::Completed => "completed",
        }
    }

    /// Display colour token; neutral bands have none.
    pub fn color(self) -> Option<&'static str> {
        match self {
            Self::Overdue => Some("red"),
            Self::Critical => Some("orange"),
            Self::Soon => Some("yellow"),
            Self::Upcoming => Some("blue"),
            Self::Scheduled => Some("green"),
            Self::Distant => Some("gray"),
            Self::Unscheduled | Self::Completed => None,
        }
    }

    /// Band for a floored day count until the deadline.
    pub fn for_days(days: i64) -> Self {
        match days {
            i64::MIN..=-1 => Self::Overdue,
            0..=2 => Self::Critical,
            3..=7 => Self::Soon,
            8..=14 => Self::Upcoming,
            15..=30 => Self::Scheduled,
            _ => Self::Distant,
        }
    }
}

/// Pure function of `(status, deadline_date, now)`.
pub fn derive_urgency(row: &ProjectRecord, now: Timestamp) -> UrgencyBand {
    if row.status == ProjectStatus::Archived {
        return UrgencyBand::Completed;
    }
    match row.deadline_date {
        Some(deadline) => UrgencyBand::for_days(whole_days_between(now, deadline)),
        None => UrgencyBand::Unscheduled,
    }
}

/// Relative wording for an active row's deadline, e.g. "in 3 days".
pub fn deadline_label(row: &ProjectRecord, now: Timestamp) -> Option<String> {
    if row.status == ProjectStatus::Archived {
        return None;
    }
    let days = whole_days_between(now, row.deadline_date?);
    let label = match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        d if d > 1 => format!("in {d} days"),
        d => format!("{} days ago", -d),
    };
    Some(label)
}

#[cfg(test)]
#[path = "tests/urgency_tests.rs"]
mod tests;
