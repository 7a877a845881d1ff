mod services;
pub use services::{cmd_decompose, cmd_image};

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::blob_store::{BlobError, BlobStore, DirBlobStore};
use crate::io::config_io::{self, ConfigError};
use crate::io::service::ServiceError;
use crate::io::store::{FileStore, Storage, StoreError, resolve_data_dir};
use crate::model::accomplishment::find_accomplishment;
use crate::model::config::Config;
use crate::model::task::{ImageStatus, Task};
use crate::ops::duration::parse_duration;
use crate::ops::{achievements, tree_ops};
use crate::tui::TuiError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("no task matches {0:?}")]
    NotFound(String),
    #[error("{given:?} matches several tasks: {candidates}")]
    Ambiguous { given: String, candidates: String },
    #[error("invalid duration {0:?} (try 90, 25m or 1h30m)")]
    InvalidDuration(String),
    #[error("unknown achievement {0:?}")]
    UnknownAchievement(String),
    #[error("image generation failed after {0} attempts")]
    ImageFailed(u32),
    #[error("could not create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Tui(#[from] TuiError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("could not encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not encode config: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Where a command runs: the resolved data directory and its configuration.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: Config,
    pub json: bool,
}

impl Context {
    pub fn resolve(data_dir: Option<&Path>, json: bool) -> Result<Self, CliError> {
        let cwd = std::env::current_dir()?;
        let data_dir = resolve_data_dir(data_dir, &cwd);
        let config = config_io::read_config(&data_dir)?;
        Ok(Context {
            data_dir,
            config,
            json,
        })
    }

    pub fn storage(&self) -> Result<Storage<FileStore>, CliError> {
        Ok(Storage::new(FileStore::open(&self.data_dir)?))
    }

    pub fn blobs(&self) -> DirBlobStore {
        DirBlobStore::new(self.data_dir.join(&self.config.storage.images_dir))
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("tasker.log")
    }

    /// Create the data directory so the log file can be opened in it.
    pub fn ensure_data_dir(&self) -> Result<(), CliError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| CliError::CreateDir {
            path: self.data_dir.clone(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(command: Option<Commands>, ctx: &Context) -> Result<(), CliError> {
    match command {
        None => cmd_play(PlayArgs { id: None }, ctx),
        Some(cmd) => match cmd {
            // Read commands
            Commands::List(args) => cmd_list(args, ctx),
            Commands::Show(args) => cmd_show(args, ctx),
            Commands::Stats => cmd_stats(ctx),
            Commands::Achievements(args) => cmd_achievements(args, ctx),

            // Write commands
            Commands::Add(args) => cmd_add(args, ctx),
            Commands::Sub(args) => cmd_sub(args, ctx),
            Commands::Rename(args) => cmd_rename(args, ctx),
            Commands::Duration(args) => cmd_duration(args, ctx),
            Commands::Mv(args) => cmd_mv(args, ctx),
            Commands::Rm(args) => cmd_rm(args, ctx),
            Commands::Done(args) => cmd_done(args, ctx),
            Commands::Reopen(args) => cmd_reopen(args, ctx),

            // Session
            Commands::Play(args) => cmd_play(args, ctx),

            // Remote services
            Commands::Decompose(args) => cmd_decompose(args, ctx),
            Commands::Image(args) => cmd_image(args, ctx),

            Commands::Config(args) => cmd_config(args, ctx),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve a full id or a unique prefix (a leading `#` is ignored).
pub fn resolve_id(tasks: &[Task], given: &str) -> Result<String, CliError> {
    let wanted = given.trim().trim_start_matches('#');
    if wanted.is_empty() {
        return Err(CliError::NotFound(given.to_string()));
    }
    let all = tree_ops::walk(tasks);
    if all.iter().any(|(_, t)| t.id == wanted) {
        return Ok(wanted.to_string());
    }
    let matches: Vec<&Task> = all
        .into_iter()
        .map(|(_, t)| t)
        .filter(|t| t.id.starts_with(wanted))
        .collect();
    match matches.as_slice() {
        [] => Err(CliError::NotFound(given.to_string())),
        [one] => Ok(one.id.clone()),
        many => Err(CliError::Ambiguous {
            given: given.to_string(),
            candidates: many
                .iter()
                .map(|t| format!("#{} {}", short_id(&t.id), t.display_name()))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

fn duration_or_default(raw: Option<&str>, ctx: &Context) -> Result<u64, CliError> {
    match raw {
        None => Ok(ctx.config.tasks.default_duration),
        Some(raw) => parse_duration(raw).ok_or_else(|| CliError::InvalidDuration(raw.to_string())),
    }
}

fn committed_name<'a>(name: &'a str, ctx: &'a Context) -> &'a str {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        &ctx.config.tasks.fallback_name
    } else {
        trimmed
    }
}

/// Delete blobs no longer referenced. Failures are logged, not returned.
fn discard_blobs<'a>(ctx: &Context, image_ids: impl IntoIterator<Item = &'a str>) {
    let blobs = ctx.blobs();
    for id in image_ids {
        if let Err(e) = blobs.delete(id) {
            warn!(image = id, error = %e, "could not delete image blob");
        }
    }
}

/// Load, edit by resolved id, save.
fn edit_task(
    ctx: &Context,
    given: &str,
    edit: impl FnOnce(&[Task], &str) -> Vec<Task>,
) -> Result<(Vec<Task>, String), CliError> {
    let storage = ctx.storage()?;
    let tasks = storage.load_tree()?;
    let id = resolve_id(&tasks, given)?;
    let next = edit(&tasks, &id);
    storage.save_tree(&next)?;
    Ok((next, id))
}

fn print_task_line(tasks: &[Task], id: &str) {
    if let Some(task) = tree_ops::find(tasks, id) {
        println!("{}", format_task_line(task));
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, ctx: &Context) -> Result<(), CliError> {
    let tasks = ctx.storage()?.load_tree()?;
    if ctx.json {
        let json: Vec<TaskJson> = tasks.iter().map(task_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if tasks.is_empty() {
        println!("no tasks yet (add one with `tk add <name>`)");
    } else {
        for line in format_tree(&tasks, args.open) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_show(args: IdArgs, ctx: &Context) -> Result<(), CliError> {
    let tasks = ctx.storage()?.load_tree()?;
    let id = resolve_id(&tasks, &args.id)?;
    let task = tree_ops::find(&tasks, &id).ok_or_else(|| CliError::NotFound(args.id.clone()))?;
    let parent = tree_ops::find_parent(&tasks, &id);
    let image_url = match &task.image {
        Some(image) if image.status == ImageStatus::Ready => ctx.blobs().url(&image.image_id)?,
        _ => None,
    };

    if ctx.json {
        let json = ShowJson {
            task: task_to_json(task),
            parent: parent.map(|p| p.id.as_str()),
            image_url,
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for line in format_task_detail(task, parent, image_url.as_deref()) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_stats(ctx: &Context) -> Result<(), CliError> {
    let stats = ctx.storage()?.load_stats()?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        for line in format_stats(&stats) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_achievements(args: AchievementsCmd, ctx: &Context) -> Result<(), CliError> {
    let storage = ctx.storage()?;
    let mut stats = storage.load_stats()?;
    match args.action.unwrap_or(AchievementsAction::List) {
        AchievementsAction::List => {
            let catalog = achievements::catalog(&stats);
            if ctx.json {
                let json: Vec<AchievementJson> =
                    catalog.into_iter().map(achievement_to_json).collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                for line in format_achievements(&catalog) {
                    println!("{}", line);
                }
            }
        }
        AchievementsAction::Revoke { id } => {
            let entry =
                find_accomplishment(&id).ok_or_else(|| CliError::UnknownAchievement(id.clone()))?;
            if achievements::revoke(&mut stats, entry.id) {
                storage.save_stats(&stats)?;
                println!("revoked {}: {}", entry.id, entry.title);
            } else {
                println!("{} was not unlocked", entry.id);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, ctx: &Context) -> Result<(), CliError> {
    let duration = duration_or_default(args.duration.as_deref(), ctx)?;
    let storage = ctx.storage()?;
    let tasks = storage.load_tree()?;
    let task = Task::new(Task::generate_id(), committed_name(&args.name, ctx), duration);
    let id = task.id.clone();
    storage.save_tree(&tree_ops::add_top_level(&tasks, task))?;
    println!("{}", id);
    Ok(())
}

fn cmd_sub(args: SubArgs, ctx: &Context) -> Result<(), CliError> {
    let duration = duration_or_default(args.duration.as_deref(), ctx)?;
    let child = Task::new(Task::generate_id(), committed_name(&args.name, ctx), duration);
    let child_id = child.id.clone();
    edit_task(ctx, &args.parent, |tasks, parent_id| {
        let grown = tree_ops::add_child(tasks, parent_id, child);
        tree_ops::reopen_ancestry(&grown, parent_id)
    })?;
    println!("{}", child_id);
    Ok(())
}

fn cmd_rename(args: RenameArgs, ctx: &Context) -> Result<(), CliError> {
    let fallback = ctx.config.tasks.fallback_name.clone();
    let (tasks, id) = edit_task(ctx, &args.id, |tasks, id| {
        tree_ops::commit_name(tasks, id, &args.name, &fallback)
    })?;
    print_task_line(&tasks, &id);
    Ok(())
}

fn cmd_duration(args: DurationArgs, ctx: &Context) -> Result<(), CliError> {
    let seconds = parse_duration(&args.duration)
        .ok_or_else(|| CliError::InvalidDuration(args.duration.clone()))?;
    let (tasks, id) = edit_task(ctx, &args.id, |tasks, id| {
        tree_ops::set_duration(tasks, id, seconds)
    })?;
    print_task_line(&tasks, &id);
    Ok(())
}

fn cmd_mv(args: MvArgs, ctx: &Context) -> Result<(), CliError> {
    let direction = match args.direction {
        MoveDirection::Up => tree_ops::Direction::Up,
        MoveDirection::Down => tree_ops::Direction::Down,
    };
    edit_task(ctx, &args.id, |tasks, id| {
        tree_ops::move_sibling(tasks, id, direction)
    })?;
    Ok(())
}

fn cmd_rm(args: IdArgs, ctx: &Context) -> Result<(), CliError> {
    let storage = ctx.storage()?;
    let tasks = storage.load_tree()?;
    let id = resolve_id(&tasks, &args.id)?;
    let image_ids: Vec<String> = tree_ops::find(&tasks, &id)
        .map(|task| {
            tree_ops::walk(std::slice::from_ref(task))
                .into_iter()
                .filter_map(|(_, t)| t.image.as_ref().map(|i| i.image_id.clone()))
                .collect()
        })
        .unwrap_or_default();
    storage.save_tree(&tree_ops::delete(&tasks, &id))?;
    discard_blobs(ctx, image_ids.iter().map(String::as_str));
    Ok(())
}

fn cmd_done(args: IdArgs, ctx: &Context) -> Result<(), CliError> {
    let (tasks, id) = edit_task(ctx, &args.id, tree_ops::complete)?;
    print_task_line(&tasks, &id);
    Ok(())
}

fn cmd_reopen(args: IdArgs, ctx: &Context) -> Result<(), CliError> {
    let (tasks, id) = edit_task(ctx, &args.id, tree_ops::reopen)?;
    print_task_line(&tasks, &id);
    Ok(())
}

fn cmd_play(args: PlayArgs, ctx: &Context) -> Result<(), CliError> {
    let start_from = match args.id {
        Some(given) => {
            let tasks = ctx.storage()?.load_tree()?;
            Some(resolve_id(&tasks, &given)?)
        }
        None => None,
    };
    crate::tui::run(ctx, start_from.as_deref())?;
    Ok(())
}

fn cmd_config(args: ConfigCmd, ctx: &Context) -> Result<(), CliError> {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&ctx.config)?);
            } else {
                print!("{}", toml::to_string_pretty(&ctx.config)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let mut doc = config_io::read_document(&ctx.data_dir)?;
            config_io::set_value(&mut doc, &key, &value)?;
            config_io::write_document(&ctx.data_dir, &doc)?;
            println!("{} = {}", key, value);
        }
    }
    Ok(())
}
