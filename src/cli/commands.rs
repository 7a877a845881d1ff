use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tk", about = concat!("tasker v", env!("CARGO_PKG_VERSION"), " - one small task at a time"), version)]
pub struct Cli {
    /// Without a subcommand, opens the play screen
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Data directory (default: nearest .tasker, or ./.tasker)
    #[arg(short = 'D', long = "data-dir", env = "TASKER_DIR", global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the task tree
    List(ListArgs),
    /// Show one task
    Show(IdArgs),
    /// Add a top-level task
    Add(AddArgs),
    /// Add a subtask
    Sub(SubArgs),
    /// Rename a task
    Rename(RenameArgs),
    /// Set a task's estimated duration
    Duration(DurationArgs),
    /// Move a task among its siblings
    Mv(MvArgs),
    /// Delete a task and its subtasks
    Rm(IdArgs),
    /// Mark a task and its subtasks done
    Done(IdArgs),
    /// Mark a task, its subtasks and its ancestors to-do
    Reopen(IdArgs),
    /// Show completion statistics
    Stats,
    /// List or manage achievements
    Achievements(AchievementsCmd),
    /// Work through tasks one leaf at a time
    Play(PlayArgs),
    /// Split a task into subtasks with the decomposition service
    Decompose(IdArgs),
    /// Manage task images
    Image(ImageCmd),
    /// Show or edit tasker.toml
    Config(ConfigCmd),
}

/// A task id, or a unique prefix of one
#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Hide finished subtrees
    #[arg(long)]
    pub open: bool,
}

#[derive(Args)]
pub struct AddArgs {
    pub name: String,
    /// Estimated duration: 90, 90s, 25m, 1h30m (default from config)
    #[arg(short, long)]
    pub duration: Option<String>,
}

#[derive(Args)]
pub struct SubArgs {
    /// Parent task id
    pub parent: String,
    pub name: String,
    #[arg(short, long)]
    pub duration: Option<String>,
}

#[derive(Args)]
pub struct RenameArgs {
    pub id: String,
    /// New name; empty falls back to tasks.fallback_name
    pub name: String,
}

#[derive(Args)]
pub struct DurationArgs {
    pub id: String,
    /// 90, 90s, 25m, 1h30m
    pub duration: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Args)]
pub struct MvArgs {
    pub id: String,
    #[arg(value_enum)]
    pub direction: MoveDirection,
}

#[derive(Args)]
pub struct PlayArgs {
    /// Start from this task instead of the first open one
    pub id: Option<String>,
}

#[derive(Args)]
pub struct AchievementsCmd {
    #[command(subcommand)]
    pub action: Option<AchievementsAction>,
}

#[derive(Subcommand)]
pub enum AchievementsAction {
    /// List the catalog with unlock state (default)
    List,
    /// Take back an unlocked achievement
    Revoke { id: String },
}

#[derive(Args)]
pub struct ImageCmd {
    #[command(subcommand)]
    pub action: ImageAction,
}

#[derive(Subcommand)]
pub enum ImageAction {
    /// Generate an image with the image service
    Generate {
        id: String,
        /// Prompt (default: the task name with its parent for context)
        prompt: Option<String>,
    },
    /// Attach an image file
    Set { id: String, file: PathBuf },
    /// Remove a task's image
    Clear { id: String },
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (default)
    Show,
    /// Set a key, e.g. `tasks.default_duration 300`
    Set { key: String, value: String },
}
