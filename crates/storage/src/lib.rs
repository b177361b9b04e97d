use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, Transaction,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::{debug, info};

use shared::{
    dates::deadline_from_submission,
    domain::{
        Channel, ChannelId, Employee, EmployeeId, EmployeeTag, ProjectCategory, ProjectId,
        ProjectRecord, ProjectStatus, ProjectType, ProjectTypeId, TagId, Timestamp,
    },
    protocol::{NewChannel, NewEmployee, NewProjectType, ProjectDraft},
};

/// Domain-level failures raised inside `anyhow` so callers can downcast.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

const PROJECT_SELECT: &str = r#"
    SELECT p.id, p.name, p.type_id, t.name AS type_name, t.category, p.status,
           p.submit_date, p.deadline_date, p.completion_date,
           p.employee_id, e.name AS employee_name
    FROM projects p
    JOIN project_types t ON t.id = p.type_id
    LEFT JOIN employees e ON e.id = p.employee_id
"#;

const PROJECT_TYPE_SELECT: &str = r#"
    SELECT id, name, category, default_processing_days, requires_employee,
           required_tag_id, channel_id
    FROM project_types
"#;

/// Resolved date and assignee columns for a project write.
struct ProjectColumns {
    submit_date: Option<Timestamp>,
    deadline_date: Option<Timestamp>,
    employee_id: Option<EmployeeId>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        // Every in-memory connection is a separate database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(%database_url, "storage ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_tag(&self, name: &str) -> Result<EmployeeTag> {
        let name = required_name("tag", name)?;
        let rec = sqlx::query("INSERT INTO employee_tags (name) VALUES (?) RETURNING id")
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(|error| conflict_or(error, format!("tag '{name}' already exists")))?;
        Ok(EmployeeTag {
            id: TagId(rec.get::<i64, _>(0)),
            name,
        })
    }

    pub async fn list_tags(&self) -> Result<Vec<EmployeeTag>> {
        let rows = sqlx::query("SELECT id, name FROM employee_tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(EmployeeTag {
                    id: TagId(row.try_get("id")?),
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    pub async fn delete_tag(&self, tag_id: TagId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM employee_tags WHERE id = ?")
            .bind(tag_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_employee(&self, employee: &NewEmployee) -> Result<Employee> {
        let name = required_name("employee", &employee.name)?;
        let mut tx = self.pool.begin().await?;
        let rec = sqlx::query("INSERT INTO employees (name) VALUES (?) RETURNING id")
            .bind(&name)
            .fetch_one(&mut *tx)
            .await?;
        let employee_id = EmployeeId(rec.get::<i64, _>(0));
        replace_employee_tags(&mut tx, employee_id, &employee.tag_ids).await?;
        tx.commit().await?;

        self.get_employee(employee_id)
            .await?
            .ok_or_else(|| not_found("employee", employee_id.0))
    }

    pub async fn get_employee(&self, employee_id: EmployeeId) -> Result<Option<Employee>> {
        let row = sqlx::query("SELECT id, name FROM employees WHERE id = ?")
            .bind(employee_id.0)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Employee {
            id: employee_id,
            name: row.try_get("name")?,
            tag_ids: self.tags_for_employee(employee_id).await?,
        }))
    }

    pub async fn list_employees(&self) -> Result<Vec<Employee>> {
        let rows = sqlx::query("SELECT id, name FROM employees ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        let mut employees = Vec::with_capacity(rows.len());
        for row in rows {
            let id = EmployeeId(row.try_get("id")?);
            employees.push(Employee {
                id,
                name: row.try_get("name")?,
                tag_ids: self.tags_for_employee(id).await?,
            });
        }
        Ok(employees)
    }

    /// Replaces the employee's tag set.
    pub async fn set_employee_tags(&self, employee_id: EmployeeId, tag_ids: &[TagId]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let exists = sqlx::query("SELECT 1 FROM employees WHERE id = ?")
            .bind(employee_id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(not_found("employee", employee_id.0));
        }
        replace_employee_tags(&mut tx, employee_id, tag_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_employee(&self, employee_id: EmployeeId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(employee_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn tags_for_employee(&self, employee_id: EmployeeId) -> Result<Vec<TagId>> {
        let rows = sqlx::query(
            "SELECT tag_id FROM employee_tag_assignments WHERE employee_id = ? ORDER BY tag_id",
        )
        .bind(employee_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| TagId(row.get::<i64, _>(0)))
            .collect())
    }

    pub async fn create_channel(&self, channel: &NewChannel) -> Result<Channel> {
        let name = required_name("channel", &channel.name)?;
        let external_id = channel.external_id.trim().to_string();
        if external_id.is_empty() {
            return Err(StorageError::Invalid("channel external id is required".into()).into());
        }
        let rec = sqlx::query("INSERT INTO channels (name, external_id) VALUES (?, ?) RETURNING id")
            .bind(&name)
            .bind(&external_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                conflict_or(error, format!("channel '{external_id}' already registered"))
            })?;
        Ok(Channel {
            id: ChannelId(rec.get::<i64, _>(0)),
            name,
            external_id,
        })
    }

    pub async fn list_channels(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query("SELECT id, name, external_id FROM channels ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(Channel {
                    id: ChannelId(row.try_get("id")?),
                    name: row.try_get("name")?,
                    external_id: row.try_get("external_id")?,
                })
            })
            .collect()
    }

    pub async fn delete_channel(&self, channel_id: ChannelId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(channel_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_project_type(&self, project_type: NewProjectType) -> Result<ProjectType> {
        let project_type = project_type.normalized();
        required_name("project type", &project_type.name)?;
        project_type
            .validate_processing_days()
            .map_err(StorageError::Invalid)?;
        let rec = sqlx::query(
            "INSERT INTO project_types
                (name, category, default_processing_days, requires_employee, required_tag_id, channel_id)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&project_type.name)
        .bind(project_type.category.label())
        .bind(project_type.default_processing_days)
        .bind(project_type.requires_employee)
        .bind(project_type.required_tag_id.map(|id| id.0))
        .bind(project_type.channel_id.map(|id| id.0))
        .fetch_one(&self.pool)
        .await
        .context("failed to insert project type")?;
        let type_id = ProjectTypeId(rec.get::<i64, _>(0));
        debug!(type_id = type_id.0, category = %project_type.category, "created project type");
        self.get_project_type(type_id)
            .await?
            .ok_or_else(|| not_found("project type", type_id.0))
    }

    pub async fn update_project_type(
        &self,
        type_id: ProjectTypeId,
        project_type: NewProjectType,
    ) -> Result<ProjectType> {
        let project_type = project_type.normalized();
        required_name("project type", &project_type.name)?;
        project_type
            .validate_processing_days()
            .map_err(StorageError::Invalid)?;
        let result = sqlx::query(
            "UPDATE project_types
             SET name = ?, category = ?, default_processing_days = ?, requires_employee = ?,
                 required_tag_id = ?, channel_id = ?
             WHERE id = ?",
        )
        .bind(&project_type.name)
        .bind(project_type.category.label())
        .bind(project_type.default_processing_days)
        .bind(project_type.requires_employee)
        .bind(project_type.required_tag_id.map(|id| id.0))
        .bind(project_type.channel_id.map(|id| id.0))
        .bind(type_id.0)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("project type", type_id.0));
        }
        self.get_project_type(type_id)
            .await?
            .ok_or_else(|| not_found("project type", type_id.0))
    }

    pub async fn get_project_type(&self, type_id: ProjectTypeId) -> Result<Option<ProjectType>> {
        let row = sqlx::query(&format!("{PROJECT_TYPE_SELECT} WHERE id = ?"))
            .bind(type_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(project_type_from_row).transpose()
    }

    pub async fn list_project_types(&self) -> Result<Vec<ProjectType>> {
        let rows = sqlx::query(&format!("{PROJECT_TYPE_SELECT} ORDER BY name, id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(project_type_from_row).collect()
    }

    /// Fails with a conflict while projects still reference the type.
    pub async fn delete_project_type(&self, type_id: ProjectTypeId) -> Result<bool> {
        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE type_id = ?")
            .bind(type_id.0)
            .fetch_one(&self.pool)
            .await?;
        if in_use > 0 {
            return Err(StorageError::Conflict(format!(
                "project type {} is used by {in_use} project(s)",
                type_id.0
            ))
            .into());
        }
        let result = sqlx::query("DELETE FROM project_types WHERE id = ?")
            .bind(type_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        let rows = sqlx::query(&format!("{PROJECT_SELECT} ORDER BY p.id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(project_from_row).collect()
    }

    pub async fn get_project(&self, project_id: ProjectId) -> Result<Option<ProjectRecord>> {
        let row = sqlx::query(&format!("{PROJECT_SELECT} WHERE p.id = ?"))
            .bind(project_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(project_from_row).transpose()
    }

    pub async fn create_project(&self, draft: &ProjectDraft, now: Timestamp) -> Result<ProjectRecord> {
        let name = required_name("project", &draft.name)?;
        let columns = self.resolve_project_columns(draft, now).await?;
        let rec = sqlx::query(
            "INSERT INTO projects (name, type_id, status, submit_date, deadline_date, employee_id)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&name)
        .bind(draft.type_id.0)
        .bind(ProjectStatus::Active.label())
        .bind(columns.submit_date)
        .bind(columns.deadline_date)
        .bind(columns.employee_id.map(|id| id.0))
        .fetch_one(&self.pool)
        .await
        .context("failed to insert project")?;
        let project_id = ProjectId(rec.get::<i64, _>(0));
        debug!(project_id = project_id.0, type_id = draft.type_id.0, "created project");
        self.get_project(project_id)
            .await?
            .ok_or_else(|| not_found("project", project_id.0))
    }

    pub async fn update_project(
        &self,
        project_id: ProjectId,
        draft: &ProjectDraft,
        now: Timestamp,
    ) -> Result<ProjectRecord> {
        let name = required_name("project", &draft.name)?;
        let columns = self.resolve_project_columns(draft, now).await?;
        let result = sqlx::query(
            "UPDATE projects
             SET name = ?, type_id = ?, submit_date = ?, deadline_date = ?, employee_id = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(&name)
        .bind(draft.type_id.0)
        .bind(columns.submit_date)
        .bind(columns.deadline_date)
        .bind(columns.employee_id.map(|id| id.0))
        .bind(project_id.0)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("project", project_id.0));
        }
        self.get_project(project_id)
            .await?
            .ok_or_else(|| not_found("project", project_id.0))
    }

    pub async fn delete_project(&self, project_id: ProjectId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(project_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Archives an active project and stamps its completion date.
    pub async fn mark_project_completed(
        &self,
        project_id: ProjectId,
        completed_at: Timestamp,
    ) -> Result<ProjectRecord> {
        let result = sqlx::query(
            "UPDATE projects
             SET status = ?, completion_date = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND status = ?",
        )
        .bind(ProjectStatus::Archived.label())
        .bind(completed_at)
        .bind(project_id.0)
        .bind(ProjectStatus::Active.label())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_project(project_id).await? {
                Some(_) => Err(StorageError::Conflict(format!(
                    "project {} is already completed",
                    project_id.0
                ))
                .into()),
                None => Err(not_found("project", project_id.0)),
            };
        }
        self.get_project(project_id)
            .await?
            .ok_or_else(|| not_found("project", project_id.0))
    }

    /// Applies the type's rules to a draft: submission deadlines are derived
    /// from the submit date, deadline types default their submit date to
    /// `now`, and the assignee is kept only when the type asks for one.
    async fn resolve_project_columns(
        &self,
        draft: &ProjectDraft,
        now: Timestamp,
    ) -> Result<ProjectColumns> {
        let project_type = self
            .get_project_type(draft.type_id)
            .await?
            .ok_or_else(|| not_found("project type", draft.type_id.0))?;

        let (submit_date, deadline_date) = match project_type.category {
            ProjectCategory::Submission => {
                let submit = draft.submit_date.ok_or_else(|| {
                    StorageError::Invalid("submit date is required for submission projects".into())
                })?;
                let deadline =
                    deadline_from_submission(submit, project_type.default_processing_days)
                        .ok_or_else(|| {
                            StorageError::Invalid(format!(
                                "deadline for '{}' is out of range",
                                project_type.name
                            ))
                        })?;
                (Some(submit), Some(deadline))
            }
            ProjectCategory::Deadline => {
                let deadline = draft.deadline_date.ok_or_else(|| {
                    StorageError::Invalid("deadline date is required for deadline projects".into())
                })?;
                (Some(draft.submit_date.unwrap_or(now)), Some(deadline))
            }
        };

        let employee_id = if project_type.requires_employee {
            let employee_id = draft.employee_id.ok_or_else(|| {
                StorageError::Invalid(format!(
                    "project type '{}' requires an employee",
                    project_type.name
                ))
            })?;
            let employee = self
                .get_employee(employee_id)
                .await?
                .ok_or_else(|| not_found("employee", employee_id.0))?;
            if let Some(tag_id) = project_type.required_tag_id {
                if !employee.has_tag(tag_id) {
                    return Err(StorageError::Invalid(format!(
                        "employee '{}' does not carry the tag required by '{}'",
                        employee.name, project_type.name
                    ))
                    .into());
                }
            }
            Some(employee_id)
        } else {
            None
        };

        Ok(ProjectColumns {
            submit_date,
            deadline_date,
            employee_id,
        })
    }
}

async fn replace_employee_tags(
    tx: &mut Transaction<'_, Sqlite>,
    employee_id: EmployeeId,
    tag_ids: &[TagId],
) -> Result<()> {
    sqlx::query("DELETE FROM employee_tag_assignments WHERE employee_id = ?")
        .bind(employee_id.0)
        .execute(&mut **tx)
        .await?;
    for tag_id in tag_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO employee_tag_assignments (employee_id, tag_id) VALUES (?, ?)",
        )
        .bind(employee_id.0)
        .bind(tag_id.0)
        .execute(&mut **tx)
        .await
        .map_err(|error| missing_reference_or(error, "tag", tag_id.0))?;
    }
    Ok(())
}

fn project_from_row(row: &SqliteRow) -> Result<ProjectRecord> {
    let category: String = row.try_get("category")?;
    let status: String = row.try_get("status")?;
    Ok(ProjectRecord {
        id: ProjectId(row.try_get("id")?),
        name: row.try_get("name")?,
        type_id: ProjectTypeId(row.try_get("type_id")?),
        type_name: row.try_get("type_name")?,
        type_category: ProjectCategory::from_str(&category)?,
        status: ProjectStatus::from_str(&status)?,
        submit_date: row.try_get("submit_date")?,
        deadline_date: row.try_get("deadline_date")?,
        completion_date: row.try_get("completion_date")?,
        employee_id: row.try_get::<Option<i64>, _>("employee_id")?.map(EmployeeId),
        assigned_employee_name: row.try_get("employee_name")?,
    })
}

fn project_type_from_row(row: &SqliteRow) -> Result<ProjectType> {
    let category: String = row.try_get("category")?;
    Ok(ProjectType {
        id: ProjectTypeId(row.try_get("id")?),
        name: row.try_get("name")?,
        category: ProjectCategory::from_str(&category)?,
        default_processing_days: row.try_get("default_processing_days")?,
        requires_employee: row.try_get("requires_employee")?,
        required_tag_id: row.try_get::<Option<i64>, _>("required_tag_id")?.map(TagId),
        channel_id: row.try_get::<Option<i64>, _>("channel_id")?.map(ChannelId),
    })
}

fn required_name(entity: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorageError::Invalid(format!("{entity} name is required")).into());
    }
    Ok(name.to_string())
}

fn not_found(entity: &'static str, id: i64) -> anyhow::Error {
    StorageError::NotFound { entity, id }.into()
}

/// Maps unique-constraint failures to `StorageError::Conflict`.
fn conflict_or(error: sqlx::Error, message: String) -> anyhow::Error {
    let unique = error
        .as_database_error()
        .is_some_and(|db_error| db_error.is_unique_violation());
    if unique {
        StorageError::Conflict(message).into()
    } else {
        error.into()
    }
}

/// Maps foreign-key failures to `StorageError::NotFound` for the referenced row.
fn missing_reference_or(error: sqlx::Error, entity: &'static str, id: i64) -> anyhow::Error {
    let missing = error
        .as_database_error()
        .is_some_and(|db_error| db_error.is_foreign_key_violation());
    if missing {
        not_found(entity, id)
    } else {
        anyhow::Error::new(error).context(format!("failed to assign {entity} {id}"))
    }
}

/// Creates the directory holding a file-backed sqlite database.
/// In-memory and non-sqlite urls are left alone.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

/// Filesystem path of a `sqlite:` url, or `None` for in-memory databases.
pub fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
