mod config;
mod render;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    CatalogRepository, DismissalStore, FileDismissals, HostEvent, NoticeLevel, Partition,
    ProjectForm, ProjectsHost, SubmitError,
};
use crossbeam_channel::{unbounded, Receiver};
use grid::{ColumnId, GridDefaults, RowActionKind, SortDirection, SortField};
use shared::{
    dates::MAX_PROCESSING_DAYS,
    domain::{
        ChannelId, EmployeeId, ProjectCategory, ProjectId, ProjectTypeId, TagId, Timestamp,
    },
    protocol::{NewChannel, NewEmployee, NewProjectType},
};
use storage::Storage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{load_settings, prepare_database_url, Settings};

const WELCOME_BANNER: &str = "welcome";

#[derive(Parser, Debug)]
#[command(name = "tools", about = "Track project deadlines from the command line")]
struct Cli {
    /// Settings file; defaults to ./tools.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum View {
    Active,
    Submission,
    Deadline,
    Completed,
}

impl From<View> for Partition {
    fn from(view: View) -> Self {
        match view {
            View::Active => Partition::Active,
            View::Submission => Partition::ActiveSubmission,
            View::Deadline => Partition::ActiveDeadline,
            View::Completed => Partition::Completed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Category {
    Submission,
    Deadline,
}

impl From<Category> for ProjectCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Submission => ProjectCategory::Submission,
            Category::Deadline => ProjectCategory::Deadline,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one page of a project view.
    List {
        #[arg(long, value_enum, default_value = "active")]
        view: View,
        /// Column to sort by, e.g. `deadline_date` or `employee`.
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long = "hide")]
        hide: Vec<String>,
        #[arg(long = "show")]
        show: Vec<String>,
    },
    AddTag {
        name: String,
    },
    AddEmployee {
        name: String,
        #[arg(long = "tag")]
        tags: Vec<i64>,
    },
    /// Replace an employee's tags.
    TagEmployee {
        employee_id: i64,
        #[arg(long = "tag")]
        tags: Vec<i64>,
    },
    AddChannel {
        name: String,
        external_id: String,
    },
    AddType {
        name: String,
        #[arg(long, value_enum)]
        category: Category,
        #[arg(
            long,
            default_value_t = 0,
            value_parser = clap::value_parser!(i64).range(0..=MAX_PROCESSING_DAYS)
        )]
        days: i64,
        #[arg(long)]
        requires_employee: bool,
        #[arg(long)]
        required_tag: Option<i64>,
        #[arg(long)]
        channel: Option<i64>,
    },
    /// Change a project type; omitted options keep their current value.
    EditType {
        type_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum)]
        category: Option<Category>,
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..=MAX_PROCESSING_DAYS))]
        days: Option<i64>,
        #[arg(long)]
        requires_employee: Option<bool>,
        #[arg(long, conflicts_with = "clear_required_tag")]
        required_tag: Option<i64>,
        #[arg(long)]
        clear_required_tag: bool,
        #[arg(long, conflicts_with = "clear_channel")]
        channel: Option<i64>,
        #[arg(long)]
        clear_channel: bool,
    },
    DeleteTag {
        tag_id: i64,
    },
    DeleteEmployee {
        employee_id: i64,
    },
    DeleteChannel {
        channel_id: i64,
    },
    /// Fails while projects still use the type.
    DeleteType {
        type_id: i64,
    },
    AddProject {
        name: String,
        #[arg(long = "type")]
        type_id: i64,
        /// `YYYY-MM-DD` or RFC 3339.
        #[arg(long)]
        submit: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        employee: Option<i64>,
    },
    EditProject {
        project_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        type_id: Option<i64>,
        #[arg(long)]
        submit: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        employee: Option<i64>,
    },
    Complete {
        project_id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    Delete {
        project_id: i64,
        #[arg(long)]
        yes: bool,
    },
    Types,
    Employees,
    Channels,
    DismissBanner,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(database_url) = cli.database_url.clone() {
        settings.database_url = database_url;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open database '{database_url}'"))?;
    debug!(%database_url, "database opened");

    run(cli.command, &settings, storage).await
}

async fn run(command: Command, settings: &Settings, storage: Storage) -> Result<()> {
    match command {
        Command::List {
            view,
            sort,
            desc,
            page,
            page_size,
            filter,
            hide,
            show,
        } => {
            show_welcome_banner(settings);
            let partition = Partition::from(view);
            let (mut host, _events) = host(storage);
            host.refresh().await?;
            let mut grid = host.grid_with_defaults(partition, grid_defaults(settings, partition));

            if let Some(size) = page_size {
                grid.set_page_size(size);
            }
            if let Some(sort) = sort {
                let field: SortField = sort.parse().map_err(|err: String| anyhow!(err))?;
                let direction = if desc {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                };
                grid.set_sort(field, direction);
            } else if desc {
                let field = grid.state().sort_field();
                grid.set_sort(field, SortDirection::Descending);
            }
            if let Some(filter) = filter {
                grid.set_filter(filter);
            }
            for (names, visible) in [(hide, false), (show, true)] {
                for name in names {
                    let column: ColumnId = name.parse().map_err(|err: String| anyhow!(err))?;
                    grid.set_column_visible(column, visible);
                }
            }
            grid.set_page(page - 1);

            print!("{}", render::render_grid(&grid.render(Utc::now())));
        }
        Command::AddTag { name } => {
            let tag = storage.create_tag(&name).await?;
            println!("created tag_id={}", tag.id);
        }
        Command::AddEmployee { name, tags } => {
            let employee = storage
                .create_employee(&NewEmployee {
                    name,
                    tag_ids: tags.into_iter().map(TagId).collect(),
                })
                .await?;
            println!("created employee_id={}", employee.id);
        }
        Command::TagEmployee { employee_id, tags } => {
            let tag_ids: Vec<TagId> = tags.into_iter().map(TagId).collect();
            storage
                .set_employee_tags(EmployeeId(employee_id), &tag_ids)
                .await?;
            println!("updated tags for employee_id={employee_id}");
        }
        Command::AddChannel { name, external_id } => {
            let channel = storage
                .create_channel(&NewChannel { name, external_id })
                .await?;
            println!("created channel_id={}", channel.id);
        }
        Command::AddType {
            name,
            category,
            days,
            requires_employee,
            required_tag,
            channel,
        } => {
            let project_type = storage
                .create_project_type(NewProjectType {
                    name,
                    category: category.into(),
                    default_processing_days: days,
                    requires_employee,
                    required_tag_id: required_tag.map(TagId),
                    channel_id: channel.map(ChannelId),
                })
                .await?;
            println!("created type_id={}", project_type.id);
        }
        Command::EditType {
            type_id,
            name,
            category,
            days,
            requires_employee,
            required_tag,
            clear_required_tag,
            channel,
            clear_channel,
        } => {
            let type_id = ProjectTypeId(type_id);
            let current = storage
                .get_project_type(type_id)
                .await?
                .ok_or_else(|| anyhow!("project type {type_id} not found"))?;
            let required_tag_id = match (required_tag, clear_required_tag) {
                (_, true) => None,
                (Some(tag), false) => Some(TagId(tag)),
                (None, false) => current.required_tag_id,
            };
            let channel_id = match (channel, clear_channel) {
                (_, true) => None,
                (Some(channel), false) => Some(ChannelId(channel)),
                (None, false) => current.channel_id,
            };
            let project_type = storage
                .update_project_type(
                    type_id,
                    NewProjectType {
                        name: name.unwrap_or(current.name),
                        category: category.map_or(current.category, ProjectCategory::from),
                        default_processing_days: days.unwrap_or(current.default_processing_days),
                        requires_employee: requires_employee.unwrap_or(current.requires_employee),
                        required_tag_id,
                        channel_id,
                    },
                )
                .await?;
            println!("updated type_id={}", project_type.id);
        }
        Command::DeleteTag { tag_id } => {
            if !storage.delete_tag(TagId(tag_id)).await? {
                bail!("tag {tag_id} not found");
            }
            println!("deleted tag_id={tag_id}");
        }
        Command::DeleteEmployee { employee_id } => {
            if !storage.delete_employee(EmployeeId(employee_id)).await? {
                bail!("employee {employee_id} not found");
            }
            println!("deleted employee_id={employee_id}");
        }
        Command::DeleteChannel { channel_id } => {
            if !storage.delete_channel(ChannelId(channel_id)).await? {
                bail!("channel {channel_id} not found");
            }
            println!("deleted channel_id={channel_id}");
        }
        Command::DeleteType { type_id } => {
            if !storage.delete_project_type(ProjectTypeId(type_id)).await? {
                bail!("project type {type_id} not found");
            }
            println!("deleted type_id={type_id}");
        }
        Command::AddProject {
            name,
            type_id,
            submit,
            deadline,
            employee,
        } => {
            let mut form = ProjectForm::for_create();
            form.name = name;
            form.type_id = Some(ProjectTypeId(type_id));
            form.submit_date = submit.as_deref().map(parse_date).transpose()?;
            form.deadline_date = deadline.as_deref().map(parse_date).transpose()?;
            form.employee_id = employee.map(EmployeeId);
            let form = form;
            let (mut host, events) = host(storage);
            host.load_catalog().await?;
            let saved = submit_form(&mut host, &form, &events).await?;
            println!("created project_id={}", saved.id);
        }
        Command::EditProject {
            project_id,
            name,
            type_id,
            submit,
            deadline,
            employee,
        } => {
            let (mut host, events) = host(storage);
            host.refresh().await?;
            host.load_catalog().await?;
            let action = host
                .grid(Partition::Active)
                .request_action(RowActionKind::Edit, ProjectId(project_id))
                .ok_or_else(|| anyhow!("project {project_id} is not an active project"))?;
            let mut form = host
                .handle_row_action(action)
                .ok_or_else(|| anyhow!("project {project_id} not found"))?;
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(type_id) = type_id {
                form.select_type(ProjectTypeId(type_id));
            }
            if let Some(submit) = submit {
                form.submit_date = Some(parse_date(&submit)?);
            }
            if let Some(deadline) = deadline {
                form.deadline_date = Some(parse_date(&deadline)?);
            }
            if let Some(employee) = employee {
                form.employee_id = Some(EmployeeId(employee));
            }
            let saved = submit_form(&mut host, &form, &events).await?;
            println!("updated project_id={}", saved.id);
        }
        Command::Complete { project_id, yes } => {
            confirm_row_action(
                storage,
                Partition::Active,
                RowActionKind::MarkCompleted,
                ProjectId(project_id),
                yes,
            )
            .await?;
        }
        Command::Delete { project_id, yes } => {
            let project_id = ProjectId(project_id);
            let partition = match storage.get_project(project_id).await? {
                Some(record) if record.is_active() => Partition::Active,
                Some(_) => Partition::Completed,
                None => bail!("project {project_id} not found"),
            };
            confirm_row_action(storage, partition, RowActionKind::Delete, project_id, yes).await?;
        }
        Command::Types => {
            let types = storage.project_types().await?;
            print!("{}", render::render_project_types(&types));
        }
        Command::Employees => {
            let employees = storage.employees().await?;
            let tags = storage.list_tags().await?;
            print!("{}", render::render_employees(&employees, &tags));
        }
        Command::Channels => {
            let channels = storage.list_channels().await?;
            print!("{}", render::render_channels(&channels));
        }
        Command::DismissBanner => {
            let mut banners =
                DismissalStore::open(FileDismissals::new(&settings.banner_state_path))?;
            banners.dismiss(WELCOME_BANNER)?;
            println!("banner dismissed");
        }
    }

    Ok(())
}

fn host(storage: Storage) -> (ProjectsHost<Storage>, Receiver<HostEvent>) {
    let (event_tx, event_rx) = unbounded();
    (ProjectsHost::new(storage, event_tx), event_rx)
}

fn grid_defaults(settings: &Settings, partition: Partition) -> &GridDefaults {
    match partition {
        Partition::Completed => &settings.completed_grid,
        _ => &settings.active_grid,
    }
}

async fn submit_form(
    host: &mut ProjectsHost<Storage>,
    form: &ProjectForm,
    events: &Receiver<HostEvent>,
) -> Result<shared::domain::ProjectRecord> {
    let result = host.submit(form).await;
    print_notices(events);
    match result {
        Ok(record) => Ok(record),
        Err(SubmitError::Invalid(errors)) => {
            for (field, message) in errors.iter() {
                eprintln!("{field:?}: {message}");
            }
            bail!("project form rejected")
        }
        Err(SubmitError::Repository(error)) => Err(error.into()),
    }
}

/// Routes the action through the grid's capability check and the host's
/// confirmation step, prompting unless `assume_yes`.
async fn confirm_row_action(
    storage: Storage,
    partition: Partition,
    kind: RowActionKind,
    project_id: ProjectId,
    assume_yes: bool,
) -> Result<()> {
    let (mut host, events) = host(storage);
    host.refresh().await?;
    let action = host
        .grid(partition)
        .request_action(kind, project_id)
        .ok_or_else(|| {
            anyhow!(
                "project {project_id} does not allow this action in the {} view",
                partition.label()
            )
        })?;
    host.handle_row_action(action);

    let Some(pending) = host.pending_confirmation().copied() else {
        bail!("no confirmation was requested for project {project_id}");
    };
    if !assume_yes && !prompt(pending.title(), pending.message())? {
        host.cancel();
        println!("cancelled");
        return Ok(());
    }

    let result = host.confirm().await;
    print_notices(&events);
    result?;
    Ok(())
}

fn prompt(title: &str, message: &str) -> Result<bool> {
    print!("{title}: {message} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_notices(events: &Receiver<HostEvent>) {
    for event in events.try_iter() {
        if let HostEvent::Notice(notice) = event {
            match notice.level {
                NoticeLevel::Success => println!("{}", notice.message),
                NoticeLevel::Error => match notice.error {
                    Some(error) => eprintln!("{}: {}", notice.message, error.message),
                    None => eprintln!("{}", notice.message),
                },
            }
        }
    }
}

fn show_welcome_banner(settings: &Settings) {
    match DismissalStore::open(FileDismissals::new(&settings.banner_state_path)) {
        Ok(banners) if banners.is_dismissed(WELCOME_BANNER) => {}
        Ok(_) => eprintln!(
            "Tip: use `--view completed` for archived projects. Hide this with `tools dismiss-banner`."
        ),
        Err(error) => debug!(%error, "banner state unavailable"),
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
fn parse_date(value: &str) -> Result<Timestamp> {
    if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("invalid date '{value}'"))?;
        return Ok(midnight.and_utc());
    }
    DateTime::parse_from_rfc3339(value.trim())
        .map(|date| date.with_timezone(&Utc))
        .with_context(|| format!("invalid date '{value}', expected YYYY-MM-DD or RFC 3339"))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
