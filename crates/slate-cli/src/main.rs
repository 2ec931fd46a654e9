//! Slate CLI - shared task slate from the command line
//!
//! Stages edits in a per-invocation session and reconciles them against the
//! shared store before exiting. The staged buffer never outlives the process.

use std::env;
use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use slate_core::models::{parse_timestamp, Task, TaskField, TaskStatus};
use slate_core::overlay::TaskFilter;
use slate_core::reconcile::CommitReport;
use slate_core::store::FileRowStore;
use slate_core::{auth::UserDirectory, Role, Session, TaskDraft, TaskId, User};
use thiserror::Error;


#[derive(Parser)]
#[command(name = "slate")]
#[command(about = "Shared task slate over a positional row store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory holding tasks.json and users.json
    #[arg(long, value_name = "PATH", global = true)]
    dir: Option<PathBuf>,

    /// Act as this registered user
    #[arg(long = "as", value_name = "USERNAME", global = true)]
    as_user: Option<String>,

    /// Credential for the acting user
    #[arg(long, value_name = "SECRET", global = true)]
    credential: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a username, or verify an existing one
    Login {
        /// Username to register or verify
        username: String,
        /// Role for a new registration
        #[arg(long, value_enum)]
        role: RoleArg,
        /// Credential to register or verify with
        #[arg(long, value_name = "SECRET")]
        secret: String,
    },
    /// Create a task
    Add {
        /// Task title
        title: String,
        /// Longer description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Assignee username, or "All" to broadcast
        #[arg(long, default_value = "All")]
        assign: String,
        /// Deadline as "YYYY-MM-DD HH:MM"
        #[arg(long, value_name = "WHEN")]
        deadline: Option<String>,
    },
    /// List tasks in deadline order
    List {
        /// Filter by status
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Only tasks assigned to the acting user (or broadcast)
        #[arg(long)]
        mine: bool,
    },
    /// Mark a task done
    Done {
        /// Task id
        id: String,
    },
    /// Edit task fields
    Edit {
        /// Task id
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        assign: Option<String>,
        /// New deadline, or an empty string to clear it
        #[arg(long, value_name = "WHEN")]
        deadline: Option<String>,
    },
    /// Delete a task
    Delete {
        /// Task id
        id: String,
    },
    /// List registered users
    Users,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum RoleArg {
    Coordinator,
    Head,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Coordinator => Self::Coordinator,
            RoleArg::Head => Self::Head,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum StatusArg {
    Pending,
    Done,
}

impl From<StatusArg> for TaskStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => Self::Pending,
            StatusArg::Done => Self::Done,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] slate_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("This command needs --as <username> and --credential <secret>")]
    AuthRequired,
    #[error("Unknown user: {0}. Register first with `slate login`.")]
    UnknownUser(String),
    #[error("Wrong credential for {0}")]
    WrongCredential(String),
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Bad deadline {0:?}: expected \"YYYY-MM-DD HH:MM\"")]
    BadDeadline(String),
    #[error("--mine needs --as <username>")]
    MineNeedsUser,
    #[error("{0} staged change(s) could not be applied; they were not committed")]
    PartialCommit(usize),
    #[error("No data directory available; pass --dir or set SLATE_DIR")]
    NoDataDir,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("slate=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.dir.clone())?;
    tracing::debug!("using data dir {}", data_dir.display());

    match cli.command {
        Commands::Login {
            username,
            role,
            secret,
        } => run_login(&data_dir, &username, role.into(), &secret),
        Commands::Add {
            title,
            description,
            assign,
            deadline,
        } => {
            let user = authenticate(&data_dir, cli.as_user.as_deref(), cli.credential.as_deref())?;
            run_add(&data_dir, &user, &title, &description, &assign, deadline.as_deref())
        }
        Commands::List { status, mine } => {
            run_list(&data_dir, status, mine, cli.as_user.as_deref())
        }
        Commands::Done { id } => {
            let user = authenticate(&data_dir, cli.as_user.as_deref(), cli.credential.as_deref())?;
            run_done(&data_dir, &user, &id)
        }
        Commands::Edit {
            id,
            title,
            description,
            assign,
            deadline,
        } => {
            let user = authenticate(&data_dir, cli.as_user.as_deref(), cli.credential.as_deref())?;
            run_edit(&data_dir, &user, &id, title, description, assign, deadline)
        }
        Commands::Delete { id } => {
            let user = authenticate(&data_dir, cli.as_user.as_deref(), cli.credential.as_deref())?;
            run_delete(&data_dir, &user, &id)
        }
        Commands::Users => run_users(&data_dir),
    }
}

/// Pick the data directory: flag, then SLATE_DIR, then the platform data dir
fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Ok(dir) = env::var("SLATE_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::data_dir()
        .map(|base| base.join("slate"))
        .ok_or(CliError::NoDataDir)
}

fn tasks_store(data_dir: &std::path::Path) -> Result<FileRowStore, CliError> {
    Ok(FileRowStore::open(data_dir.join("tasks.json"))?)
}

fn user_directory(data_dir: &std::path::Path) -> Result<UserDirectory<FileRowStore>, CliError> {
    Ok(UserDirectory::new(FileRowStore::open(
        data_dir.join("users.json"),
    )?))
}

/// Resolve `--as`/`--credential` into a verified user
fn authenticate(
    data_dir: &std::path::Path,
    username: Option<&str>,
    credential: Option<&str>,
) -> Result<User, CliError> {
    let (Some(username), Some(credential)) = (username, credential) else {
        return Err(CliError::AuthRequired);
    };

    let directory = user_directory(data_dir)?;
    let outcome = directory.verify(username, credential)?;
    if outcome.is_new {
        return Err(CliError::UnknownUser(username.to_string()));
    }
    if !outcome.is_valid {
        return Err(CliError::WrongCredential(username.to_string()));
    }
    directory
        .find(username)?
        .ok_or_else(|| CliError::UnknownUser(username.to_string()))
}

fn run_login(
    data_dir: &std::path::Path,
    username: &str,
    role: Role,
    secret: &str,
) -> Result<(), CliError> {
    let mut directory = user_directory(data_dir)?;
    let outcome = directory.verify(username, secret)?;
    if !outcome.is_new && !outcome.is_valid {
        return Err(CliError::WrongCredential(username.to_string()));
    }

    let user = directory.login(username, role, secret)?;
    println!("Logged in as {} ({})", user.username, user.role);
    Ok(())
}

fn run_add(
    data_dir: &std::path::Path,
    user: &User,
    title: &str,
    description: &str,
    assign: &str,
    deadline: Option<&str>,
) -> Result<(), CliError> {
    if title.trim().is_empty() {
        return Err(CliError::EmptyTitle);
    }
    let deadline = parse_deadline_arg(deadline)?;

    let mut session = Session::new(user.clone(), tasks_store(data_dir)?);
    let id = session.stage_insert(TaskDraft {
        title: title.trim().to_string(),
        description: description.to_string(),
        assigned_to: assign.to_string(),
        deadline,
    });
    let report = session.commit();
    render_report(&report);
    ensure_clean(&report)?;

    println!("Added task {id}");
    Ok(())
}

fn run_list(
    data_dir: &std::path::Path,
    status: Option<StatusArg>,
    mine: bool,
    as_user: Option<&str>,
) -> Result<(), CliError> {
    let filter = build_filter(status, mine, as_user)?;

    let store = tasks_store(data_dir)?;
    let anonymous = User::new(as_user.unwrap_or("anonymous"), Role::Coordinator, "");
    let mut session = Session::new(anonymous, store);

    let view = session.tasks(filter.as_ref());
    if let Some(error) = view.fetch_error {
        eprintln!("Warning: showing stale data ({error})");
    }
    if view.tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for task in &view.tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

fn build_filter(
    status: Option<StatusArg>,
    mine: bool,
    as_user: Option<&str>,
) -> Result<Option<TaskFilter>, CliError> {
    let assigned_to = if mine {
        let Some(username) = as_user else {
            return Err(CliError::MineNeedsUser);
        };
        Some(username.to_string())
    } else {
        None
    };

    if status.is_none() && assigned_to.is_none() {
        return Ok(None);
    }
    Ok(Some(TaskFilter {
        status: status.map(TaskStatus::from),
        assigned_to,
    }))
}

fn run_done(data_dir: &std::path::Path, user: &User, id: &str) -> Result<(), CliError> {
    let mut session = Session::new(user.clone(), tasks_store(data_dir)?);
    let id = TaskId::from(id);
    session.mark_done(&id)?;
    let report = session.commit();
    render_report(&report);
    ensure_clean(&report)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_edit(
    data_dir: &std::path::Path,
    user: &User,
    id: &str,
    title: Option<String>,
    description: Option<String>,
    assign: Option<String>,
    deadline: Option<String>,
) -> Result<(), CliError> {
    let mut session = Session::new(user.clone(), tasks_store(data_dir)?);
    let id = TaskId::from(id);

    if let Some(title) = title {
        session.stage_update(&id, TaskField::Title, &title)?;
    }
    if let Some(description) = description {
        session.stage_update(&id, TaskField::Description, &description)?;
    }
    if let Some(assign) = assign {
        session.stage_update(&id, TaskField::AssignedTo, &assign)?;
    }
    if let Some(deadline) = deadline {
        // Validate eagerly for a friendlier message; empty clears the deadline
        if !deadline.is_empty() && parse_timestamp(&deadline).is_err() {
            return Err(CliError::BadDeadline(deadline));
        }
        session.stage_update(&id, TaskField::Deadline, &deadline)?;
    }

    if !session.has_pending() {
        println!("Nothing to change.");
        return Ok(());
    }

    let report = session.commit();
    render_report(&report);
    ensure_clean(&report)?;
    Ok(())
}

fn run_delete(data_dir: &std::path::Path, user: &User, id: &str) -> Result<(), CliError> {
    let mut session = Session::new(user.clone(), tasks_store(data_dir)?);
    let id = TaskId::from(id);
    session.stage_delete(&id);
    let report = session.commit();
    render_report(&report);
    ensure_clean(&report)?;
    Ok(())
}

fn run_users(data_dir: &std::path::Path) -> Result<(), CliError> {
    let directory = user_directory(data_dir)?;
    let users = directory.load_users()?;
    if users.is_empty() {
        println!("No registered users.");
        return Ok(());
    }
    for user in users {
        println!("{} ({})", user.username, user.role);
    }
    Ok(())
}

fn parse_deadline_arg(
    value: Option<&str>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, CliError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .map_err(|_| CliError::BadDeadline(raw.to_string())),
    }
}

/// One display line per task, stable enough to grep
fn format_task_line(task: &Task) -> String {
    let deadline = task
        .deadline
        .map_or_else(|| "no deadline".to_string(), |when| {
            format!("due {}", slate_core::models::format_timestamp(&when))
        });
    format!(
        "{}  [{}] {} (assigned: {}, by {}, {})",
        task.id, task.status, task.title, task.assigned_to, task.created_by, deadline
    )
}

fn render_report(report: &CommitReport) {
    for id in &report.skipped_missing {
        println!("Skipped {id}: already deleted by someone else");
    }
    for failure in &report.failures {
        eprintln!("Failed ({:?}): {}: {}", failure.phase, failure.id, failure.error);
    }
}

fn ensure_clean(report: &CommitReport) -> Result<(), CliError> {
    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::PartialCommit(report.failures.len()))
    }
}
