//! Create/edit form rules for projects.
//!
//! The form only knows about catalog data handed to it; it never calls a
//! repository. `validate` either yields a `ProjectDraft` ready to submit or
//! the full set of field errors.

use std::collections::BTreeMap;

use serde::Serialize;
use shared::{
    dates::deadline_from_submission,
    domain::{
        Employee, EmployeeId, ProjectCategory, ProjectId, ProjectRecord, ProjectType,
        ProjectTypeId, Timestamp,
    },
    protocol::ProjectDraft,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Name,
    Type,
    SubmitDate,
    DeadlineDate,
    Employee,
}

/// Project types and employees as last loaded from the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub project_types: Vec<ProjectType>,
    pub employees: Vec<Employee>,
}

impl Catalog {
    pub fn project_type(&self, type_id: ProjectTypeId) -> Option<&ProjectType> {
        self.project_types.iter().find(|ty| ty.id == type_id)
    }

    /// Employees carrying the type's required tag, or everyone when the type
    /// names no tag.
    pub fn eligible_employees(&self, project_type: &ProjectType) -> Vec<&Employee> {
        match project_type.required_tag_id {
            Some(tag_id) => self
                .employees
                .iter()
                .filter(|employee| employee.has_tag(tag_id))
                .collect(),
            None => self.employees.iter().collect(),
        }
    }

    pub fn is_eligible(&self, project_type: &ProjectType, employee_id: EmployeeId) -> bool {
        self.eligible_employees(project_type)
            .iter()
            .any(|employee| employee.id == employee_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} invalid field(s)", .0.len())]
pub struct FormErrors(BTreeMap<FormField, String>);

impl FormErrors {
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn insert(&mut self, field: FormField, message: &str) {
        self.0.entry(field).or_insert_with(|| message.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectForm {
    pub editing: Option<ProjectId>,
    pub name: String,
    pub type_id: Option<ProjectTypeId>,
    pub submit_date: Option<Timestamp>,
    pub deadline_date: Option<Timestamp>,
    pub employee_id: Option<EmployeeId>,
    /// Deadline stored on the project being edited.
    original_deadline: Option<Timestamp>,
}

impl ProjectForm {
    pub fn for_create() -> Self {
        Self::default()
    }

    pub fn for_edit(record: &ProjectRecord) -> Self {
        Self {
            editing: Some(record.id),
            name: record.name.clone(),
            type_id: Some(record.type_id),
            submit_date: record.submit_date,
            deadline_date: record.deadline_date,
            employee_id: record.employee_id,
            original_deadline: record.deadline_date,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Switching type keeps entered values; fields the new type hides are
    /// ignored at validation time.
    pub fn select_type(&mut self, type_id: ProjectTypeId) {
        self.type_id = Some(type_id);
    }

    pub fn visible_fields(&self, catalog: &Catalog) -> Vec<FormField> {
        let mut fields = vec![FormField::Name, FormField::Type];
        let Some(project_type) = self.type_id.and_then(|id| catalog.project_type(id)) else {
            return fields;
        };
        match project_type.category {
            ProjectCategory::Submission => fields.push(FormField::SubmitDate),
            ProjectCategory::Deadline => fields.push(FormField::DeadlineDate),
        }
        if project_type.requires_employee {
            fields.push(FormField::Employee);
        }
        fields
    }

    /// Deadline a submission project would get, for display next to the
    /// submit date picker.
    pub fn deadline_preview(&self, catalog: &Catalog) -> Option<Timestamp> {
        let project_type = catalog.project_type(self.type_id?)?;
        match project_type.category {
            ProjectCategory::Submission => {
                deadline_from_submission(self.submit_date?, project_type.default_processing_days)
            }
            ProjectCategory::Deadline => self.deadline_date,
        }
    }

    pub fn validate(&self, catalog: &Catalog, now: Timestamp) -> Result<ProjectDraft, FormErrors> {
        let mut errors = FormErrors::default();
        let name = self.name.trim();
        if name.is_empty() {
            errors.insert(FormField::Name, "Name is required");
        }

        let project_type = match self.type_id {
            None => {
                errors.insert(FormField::Type, "Type is required");
                None
            }
            Some(type_id) => {
                let found = catalog.project_type(type_id);
                if found.is_none() {
                    errors.insert(FormField::Type, "Unknown project type");
                }
                found
            }
        };
        let Some(project_type) = project_type else {
            return Err(errors);
        };

        let mut submission_deadline = None;
        match project_type.category {
            ProjectCategory::Submission => match self.submit_date {
                None => errors.insert(
                    FormField::SubmitDate,
                    "Submit date is required for submission projects",
                ),
                Some(submit) => {
                    submission_deadline =
                        deadline_from_submission(submit, project_type.default_processing_days);
                    if submission_deadline.is_none() {
                        errors.insert(
                            FormField::SubmitDate,
                            "Deadline for this submit date is out of range",
                        );
                    }
                }
            },
            ProjectCategory::Deadline => match self.deadline_date {
                None => errors.insert(
                    FormField::DeadlineDate,
                    "Deadline date is required for deadline projects",
                ),
                Some(deadline) if deadline < now && self.deadline_changed() => {
                    errors.insert(FormField::DeadlineDate, "Deadline date must be in the future")
                }
                Some(_) => {}
            },
        }

        if project_type.requires_employee {
            match self.employee_id {
                None => errors.insert(
                    FormField::Employee,
                    "Employee is required for this project type",
                ),
                Some(employee_id) if !catalog.is_eligible(project_type, employee_id) => errors
                    .insert(
                        FormField::Employee,
                        "Employee does not match the required tag",
                    ),
                Some(_) => {}
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let (submit_date, deadline_date) = match project_type.category {
            ProjectCategory::Submission => (self.submit_date, submission_deadline),
            ProjectCategory::Deadline => (self.submit_date.or(Some(now)), self.deadline_date),
        };

        Ok(ProjectDraft {
            name: name.to_string(),
            type_id: project_type.id,
            submit_date,
            deadline_date,
            employee_id: self.employee_id.filter(|_| project_type.requires_employee),
        })
    }

    /// An edit may keep an overdue deadline as long as it is left untouched.
    fn deadline_changed(&self) -> bool {
        self.editing.is_none() || self.deadline_date != self.original_deadline
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
