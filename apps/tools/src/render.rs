//! Plain-text rendering of grid views and catalog listings.

use grid::{ColumnId, GridView, RowPresentation, SortIndicator};
use shared::domain::{Channel, Employee, EmployeeTag, ProjectRecord, ProjectType, Timestamp};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(value: Option<Timestamp>) -> String {
    value
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn cell(column: ColumnId, row: &ProjectRecord, presentation: Option<&RowPresentation>) -> String {
    match column {
        ColumnId::Name => row.name.clone(),
        ColumnId::Type => row.type_name.clone(),
        ColumnId::Category => row.type_category.label().to_string(),
        ColumnId::Status => row.status.label().to_string(),
        ColumnId::SubmitDate => format_date(row.submit_date),
        ColumnId::DeadlineDate => {
            let date = format_date(row.deadline_date);
            match presentation.and_then(|p| p.deadline_label.as_deref().map(|label| (p, label))) {
                Some((p, label)) => format!("{date} ({label}) [{}]", p.urgency.label()),
                None => date,
            }
        }
        ColumnId::CompletionDate => format_date(row.completion_date),
        ColumnId::Employee => row
            .assigned_employee_name
            .clone()
            .unwrap_or_else(|| "-".to_string()),
        ColumnId::Actions => presentation
            .map(|p| {
                let caps = p.capabilities;
                [
                    (caps.can_edit, "edit"),
                    (caps.can_complete, "complete"),
                    (caps.can_delete, "delete"),
                ]
                .into_iter()
                .filter_map(|(allowed, name)| allowed.then_some(name))
                .collect::<Vec<_>>()
                .join("/")
            })
            .unwrap_or_default(),
    }
}

fn header(column: ColumnId, indicator: SortIndicator) -> String {
    let label = match column {
        ColumnId::Actions => "Actions",
        other => other.label(),
    };
    match indicator {
        SortIndicator::Ascending => format!("{label} ^"),
        SortIndicator::Descending => format!("{label} v"),
        SortIndicator::Unsorted | SortIndicator::NotSortable => label.to_string(),
    }
}

/// Table with an id column, the visible grid columns and a paging footer.
pub fn render_grid(view: &GridView) -> String {
    let columns: Vec<_> = view.columns.iter().filter(|c| c.visible).collect();
    let mut table = vec![std::iter::once("Id".to_string())
        .chain(columns.iter().map(|c| header(c.id, c.sort_indicator)))
        .collect::<Vec<_>>()];

    for (row, presentation) in view.visible_rows.iter().zip(&view.presentations) {
        table.push(
            std::iter::once(row.id.to_string())
                .chain(columns.iter().map(|c| cell(c.id, row, Some(presentation))))
                .collect(),
        );
    }

    let mut out = format_table(&table);
    if view.visible_rows.is_empty() {
        out.push_str("No projects.\n");
    }
    let pagination = view.pagination;
    out.push_str(&format!(
        "Page {} of {} ({} projects)\n",
        pagination.page + 1,
        pagination.page_count.max(1),
        pagination.total_rows
    ));
    out
}

pub fn render_project_types(types: &[ProjectType]) -> String {
    let mut table = vec![vec![
        "Id".to_string(),
        "Name".to_string(),
        "Category".to_string(),
        "Processing days".to_string(),
        "Employee".to_string(),
        "Required tag".to_string(),
    ]];
    for ty in types {
        table.push(vec![
            ty.id.to_string(),
            ty.name.clone(),
            ty.category.label().to_string(),
            ty.default_processing_days.to_string(),
            if ty.requires_employee { "required" } else { "-" }.to_string(),
            ty.required_tag_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    format_table(&table)
}

pub fn render_employees(employees: &[Employee], tags: &[EmployeeTag]) -> String {
    let mut table = vec![vec!["Id".to_string(), "Name".to_string(), "Tags".to_string()]];
    for employee in employees {
        let tag_names: Vec<&str> = tags
            .iter()
            .filter(|tag| employee.has_tag(tag.id))
            .map(|tag| tag.name.as_str())
            .collect();
        table.push(vec![
            employee.id.to_string(),
            employee.name.clone(),
            if tag_names.is_empty() {
                "-".to_string()
            } else {
                tag_names.join(", ")
            },
        ]);
    }
    format_table(&table)
}

pub fn render_channels(channels: &[Channel]) -> String {
    let mut table = vec![vec![
        "Id".to_string(),
        "Name".to_string(),
        "External id".to_string(),
    ]];
    table.extend(channels.iter().map(|channel| {
        vec![
            channel.id.to_string(),
            channel.name.clone(),
            channel.external_id.clone(),
        ]
    }));
    format_table(&table)
}

fn format_table(rows: &[Vec<String>]) -> String {
    let width_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..width_count)
        .map(|i| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|value| value.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
