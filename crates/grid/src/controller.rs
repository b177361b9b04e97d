//! Grid controller: owns the view state of one grid instance and projects the
//! current row snapshot through filter, sort and pagination.

use std::{collections::BTreeSet, sync::Arc};

use serde::{Deserialize, Serialize};
use shared::domain::{ProjectId, ProjectRecord, ProjectStatus, Timestamp};
use tracing::debug;

use crate::{
    columns::{ColumnDescriptor, ColumnId, SortIndicator},
    sort::{sort_rows, SortDirection, SortField},
    urgency::{deadline_label, derive_urgency, UrgencyBand},
};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Caller-supplied initial view configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridDefaults {
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub hidden_columns: Vec<ColumnId>,
    pub page_size: usize,
}

impl GridDefaults {
    /// Active-project views: category, status and completion date are hidden.
    pub fn active() -> Self {
        Self {
            sort_field: SortField::DeadlineDate,
            sort_direction: SortDirection::Ascending,
            hidden_columns: vec![
                ColumnId::Category,
                ColumnId::Status,
                ColumnId::CompletionDate,
            ],
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Completed view: everything but the category column is shown.
    pub fn completed() -> Self {
        Self {
            hidden_columns: vec![ColumnId::Category],
            ..Self::active()
        }
    }
}

impl Default for GridDefaults {
    fn default() -> Self {
        Self::active()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridViewState {
    sort_field: SortField,
    sort_direction: SortDirection,
    visible_columns: BTreeSet<ColumnId>,
    current_page: usize,
    page_size: usize,
    filter: Option<String>,
}

impl GridViewState {
    pub fn from_defaults(defaults: &GridDefaults) -> Self {
        let visible_columns = ColumnId::ALL
            .into_iter()
            .filter(|column| !column.is_hideable() || !defaults.hidden_columns.contains(column))
            .collect();
        Self {
            sort_field: defaults.sort_field,
            sort_direction: defaults.sort_direction,
            visible_columns,
            current_page: 0,
            page_size: defaults.page_size.max(1),
            filter: None,
        }
    }

    pub fn sort_field(&self) -> SortField {
        self.sort_field
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn is_visible(&self, column: ColumnId) -> bool {
        self.visible_columns.contains(&column)
    }

    /// Visible columns in display order.
    pub fn visible_columns(&self) -> Vec<ColumnId> {
        self.visible_columns.iter().copied().collect()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}

/// Which row actions the host wired up. A flag left `false` hides the
/// corresponding menu entry for every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridActions {
    pub edit: bool,
    pub delete: bool,
    pub mark_completed: bool,
}

impl GridActions {
    pub fn all() -> Self {
        Self {
            edit: true,
            delete: true,
            mark_completed: true,
        }
    }

    pub fn delete_only() -> Self {
        Self {
            delete: true,
            ..Self::default()
        }
    }

    pub fn any(self) -> bool {
        self.edit || self.delete || self.mark_completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RowCapabilities {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_complete: bool,
}

impl RowCapabilities {
    pub fn allows(self, kind: RowActionKind) -> bool {
        match kind {
            RowActionKind::Edit => self.can_edit,
            RowActionKind::Delete => self.can_delete,
            RowActionKind::MarkCompleted => self.can_complete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowActionKind {
    Edit,
    Delete,
    MarkCompleted,
}

/// A row action the host should carry out. The grid never executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowAction {
    pub kind: RowActionKind,
    pub project_id: ProjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowPresentation {
    pub project_id: ProjectId,
    pub urgency: UrgencyBand,
    pub color: Option<&'static str>,
    pub deadline_label: Option<String>,
    pub capabilities: RowCapabilities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

/// One render of the grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridView {
    pub visible_rows: Vec<ProjectRecord>,
    /// Same order as `visible_rows`.
    pub presentations: Vec<RowPresentation>,
    pub columns: Vec<ColumnDescriptor>,
    pub pagination: PaginationState,
    pub show_row_actions: bool,
}

impl GridView {
    pub fn presentation_for(&self, project_id: ProjectId) -> Option<&RowPresentation> {
        self.presentations
            .iter()
            .find(|presentation| presentation.project_id == project_id)
    }
}

pub struct GridController {
    rows: Arc<[ProjectRecord]>,
    state: GridViewState,
    actions: GridActions,
}

impl GridController {
    pub fn new(defaults: &GridDefaults, actions: GridActions) -> Self {
        Self {
            rows: Arc::from(Vec::new()),
            state: GridViewState::from_defaults(defaults),
            actions,
        }
    }

    pub fn with_rows(
        defaults: &GridDefaults,
        actions: GridActions,
        rows: impl Into<Arc<[ProjectRecord]>>,
    ) -> Self {
        let mut controller = Self::new(defaults, actions);
        controller.replace_rows(rows);
        controller
    }

    /// Swaps in a fresh snapshot. Nothing derived from the previous snapshot
    /// survives; only the page cursor is carried over, clamped to the new
    /// row count.
    pub fn replace_rows(&mut self, rows: impl Into<Arc<[ProjectRecord]>>) {
        self.rows = rows.into();
        self.state.current_page = self.state.current_page.min(self.last_page());
    }

    pub fn rows(&self) -> &[ProjectRecord] {
        &self.rows
    }

    pub fn state(&self) -> &GridViewState {
        &self.state
    }

    pub fn actions(&self) -> GridActions {
        self.actions
    }

    pub fn set_sort(&mut self, field: SortField, direction: SortDirection) {
        self.state.sort_field = field;
        self.state.sort_direction = direction;
        self.state.current_page = 0;
    }

    /// Header click: same column flips direction, a new column starts ascending.
    pub fn toggle_sort(&mut self, field: SortField) {
        let direction = if self.state.sort_field == field {
            self.state.sort_direction.flipped()
        } else {
            SortDirection::Ascending
        };
        self.set_sort(field, direction);
    }

    /// Header click by column id; columns without a sort affordance are ignored.
    pub fn toggle_sort_column(&mut self, column: ColumnId) {
        match SortField::for_column(column) {
            Some(field) => self.toggle_sort(field),
            None => debug!(column = column.id(), "ignoring sort on unsortable column"),
        }
    }

    /// Sort by a field name from an untyped source; unknown names are ignored.
    pub fn set_sort_by_name(&mut self, field: &str, direction: SortDirection) {
        match field.parse::<SortField>() {
            Ok(field) => self.set_sort(field, direction),
            Err(reason) => debug!(%reason, "ignoring sort request"),
        }
    }

    pub fn set_column_visible(&mut self, column: ColumnId, visible: bool) {
        if !column.is_hideable() {
            debug!(column = column.id(), "column cannot be hidden");
            return;
        }
        if visible {
            self.state.visible_columns.insert(column);
        } else {
            self.state.visible_columns.remove(&column);
        }
    }

    /// Case-insensitive substring filter over name, type and employee.
    /// Blank queries clear the filter. Always returns to the first page.
    pub fn set_filter(&mut self, query: impl Into<String>) {
        let query: String = query.into();
        let query = query.trim();
        self.state.filter = if query.is_empty() {
            None
        } else {
            Some(query.to_lowercase())
        };
        self.state.current_page = 0;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.state.page_size = page_size.max(1);
        self.state.current_page = self.state.current_page.min(self.last_page());
    }

    /// Clamps into `[0, last_page]`.
    pub fn set_page(&mut self, page: i64) {
        let last = self.last_page();
        self.state.current_page = usize::try_from(page).map_or(0, |page| page.min(last));
    }

    pub fn next_page(&mut self) {
        if self.can_go_next() {
            self.state.current_page += 1;
        }
    }

    pub fn previous_page(&mut self) {
        if self.can_go_previous() {
            self.state.current_page -= 1;
        }
    }

    pub fn can_go_next(&self) -> bool {
        self.state.current_page < self.last_page()
    }

    pub fn can_go_previous(&self) -> bool {
        self.state.current_page > 0
    }

    /// Filtered and sorted rows before pagination.
    pub fn sorted_rows(&self) -> Vec<&ProjectRecord> {
        let mut rows = self.filtered_rows();
        sort_rows(&mut rows, self.state.sort_field, self.state.sort_direction);
        rows
    }

    pub fn filtered_count(&self) -> usize {
        match &self.state.filter {
            Some(_) => self.filtered_rows().len(),
            None => self.rows.len(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.filtered_count().div_ceil(self.state.page_size)
    }

    pub fn capabilities(&self, row: &ProjectRecord) -> RowCapabilities {
        RowCapabilities {
            can_edit: self.actions.edit,
            can_delete: self.actions.delete,
            can_complete: self.actions.mark_completed && row.status == ProjectStatus::Active,
        }
    }

    /// Resolves a row action against the current snapshot by id. Returns
    /// `None` when the row is gone or the capability is not offered.
    pub fn request_action(&self, kind: RowActionKind, project_id: ProjectId) -> Option<RowAction> {
        let Some(row) = self.rows.iter().find(|row| row.id == project_id) else {
            debug!(project_id = project_id.0, ?kind, "row action for unknown project");
            return None;
        };
        if !self.capabilities(row).allows(kind) {
            debug!(project_id = project_id.0, ?kind, "row action not offered");
            return None;
        }
        Some(RowAction { kind, project_id })
    }

    pub fn columns(&self) -> Vec<ColumnDescriptor> {
        ColumnId::ALL
            .into_iter()
            .map(|id| {
                let sort_indicator = match SortField::for_column(id) {
                    None => SortIndicator::NotSortable,
                    Some(field) if field == self.state.sort_field => {
                        match self.state.sort_direction {
                            SortDirection::Ascending => SortIndicator::Ascending,
                            SortDirection::Descending => SortIndicator::Descending,
                        }
                    }
                    Some(_) => SortIndicator::Unsorted,
                };
                ColumnDescriptor {
                    id,
                    label: id.label(),
                    visible: self.state.is_visible(id),
                    hideable: id.is_hideable(),
                    sortable: SortField::for_column(id).is_some(),
                    sort_indicator,
                }
            })
            .collect()
    }

    pub fn render(&self, now: Timestamp) -> GridView {
        let sorted = self.sorted_rows();
        let total_rows = sorted.len();
        let page_size = self.state.page_size;
        let page = self.state.current_page.min(last_page_for(total_rows, page_size));

        let visible_rows: Vec<ProjectRecord> = sorted
            .into_iter()
            .skip(page * page_size)
            .take(page_size)
            .cloned()
            .collect();
        let presentations = visible_rows
            .iter()
            .map(|row| {
                let urgency = derive_urgency(row, now);
                RowPresentation {
                    project_id: row.id,
                    urgency,
                    color: urgency.color(),
                    deadline_label: deadline_label(row, now),
                    capabilities: self.capabilities(row),
                }
            })
            .collect();

        let page_count = total_rows.div_ceil(page_size);
        GridView {
            visible_rows,
            presentations,
            columns: self.columns(),
            pagination: PaginationState {
                page,
                page_count,
                page_size,
                total_rows,
                can_go_previous: page > 0,
                can_go_next: page + 1 < page_count,
            },
            show_row_actions: self.actions.any(),
        }
    }

    fn filtered_rows(&self) -> Vec<&ProjectRecord> {
        match &self.state.filter {
            Some(query) => self
                .rows
                .iter()
                .filter(|row| matches_filter(row, query))
                .collect(),
            None => self.rows.iter().collect(),
        }
    }

    fn last_page(&self) -> usize {
        last_page_for(self.filtered_count(), self.state.page_size)
    }
}

fn last_page_for(count: usize, page_size: usize) -> usize {
    count.saturating_sub(1) / page_size.max(1)
}

/// `query` is already lowercased.
fn matches_filter(row: &ProjectRecord, query: &str) -> bool {
    row.name.to_lowercase().contains(query)
        || row.type_name.to_lowercase().contains(query)
        || row
            .assigned_employee_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(query))
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
