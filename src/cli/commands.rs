use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::{Priority, ProjectId, TaskId};

#[derive(Parser)]
#[command(name = "arb", about = concat!("arbor v", env!("CARGO_PKG_VERSION"), " - nested tasks, kept in sync"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Read configuration from this file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server root URL (overrides the config file)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Log debug detail to the journal
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List projects
    Projects,
    /// Show a project's task tree
    Tree(TreeArgs),
    /// Add a task or subtask
    Add(AddArgs),
    /// Change a task's title, description or priority
    Edit(EditArgs),
    /// Mark a task and its subtasks complete
    Done(TaskRef),
    /// Mark a task incomplete
    Undone(TaskRef),
    /// Hide a task's subtasks
    Fold(TaskRef),
    /// Show a task's subtasks
    Unfold(TaskRef),
    /// Delete a task and its subtasks
    Rm(TaskRef),
    /// List where a task can be moved
    Targets(TargetsArgs),
    /// Move a task under another parent or project
    Mv(MvArgs),
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TreeArgs {
    pub project: ProjectId,
    /// Include subtasks of folded tasks
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct TargetsArgs {
    pub project: ProjectId,
    /// Task to move (e.g. 12 or #12)
    pub id: TaskId,
    /// Destination project (default: same project)
    #[arg(long)]
    pub to: Option<ProjectId>,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskRef {
    pub project: ProjectId,
    /// Task id (e.g. 12 or #12)
    pub id: TaskId,
}

#[derive(Args)]
pub struct AddArgs {
    pub project: ProjectId,
    /// Task title
    pub title: String,
    /// Parent task (creates a subtask)
    #[arg(long)]
    pub parent: Option<TaskId>,
    #[arg(long)]
    pub description: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub priority: Option<Priority>,
}

#[derive(Args)]
pub struct EditArgs {
    pub project: ProjectId,
    pub id: TaskId,
    #[arg(long)]
    pub title: Option<String>,
    /// New description (empty string clears it)
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<Priority>,
}

#[derive(Args)]
pub struct MvArgs {
    pub project: ProjectId,
    pub id: TaskId,
    /// Destination project (default: same project)
    #[arg(long)]
    pub to: Option<ProjectId>,
    /// New parent task (default: top level)
    #[arg(long)]
    pub parent: Option<TaskId>,
    /// Position among the new siblings
    #[arg(long, default_value_t = 0)]
    pub position: u32,
}
