use std::fs;

use tracing::{info, warn};

use super::{CliError, Context, discard_blobs, resolve_id};
use crate::cli::commands::{IdArgs, ImageAction, ImageCmd};
use crate::cli::output::format_task_line;
use crate::io::blob_store::BlobStore;
use crate::io::service::{HttpDecomposer, HttpImageGenerator};
use crate::model::task::{TaskImage, generate_image_id};
use crate::ops::decompose::request_subtasks;
use crate::ops::events::{TreeEvent, apply_event};
use crate::ops::image_gen::{self, RetryPolicy};
use crate::ops::tree_ops;

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

pub fn cmd_decompose(args: IdArgs, ctx: &Context) -> Result<(), CliError> {
    let storage = ctx.storage()?;
    let tasks = storage.load_tree()?;
    let id = resolve_id(&tasks, &args.id)?;
    let service = HttpDecomposer::from_config(&ctx.config.service)?;

    let event = runtime()?
        .block_on(request_subtasks(&service, &tasks, &id))?
        .ok_or_else(|| CliError::NotFound(args.id.clone()))?;

    // The tree may have been edited while the request was out.
    let latest = storage.load_tree()?;
    let applied = apply_event(&latest, &event, ctx.config.tasks.default_duration);
    if !applied.applied {
        warn!(task = %id, "task vanished during decomposition");
        println!("task was removed meanwhile; nothing added");
        return Ok(());
    }
    storage.save_tree(&applied.tasks)?;

    if let Some(parent) = tree_ops::find(&applied.tasks, &id) {
        println!("{}", format_task_line(parent));
        let added = match &event {
            TreeEvent::SubtasksProposed { titles, .. } => titles.len(),
            _ => 0,
        };
        let start = parent.subtasks.len().saturating_sub(added);
        for sub in &parent.subtasks[start..] {
            println!("  {}", format_task_line(sub));
        }
    }
    Ok(())
}

pub fn cmd_image(args: ImageCmd, ctx: &Context) -> Result<(), CliError> {
    match args.action {
        ImageAction::Generate { id, prompt } => generate(ctx, &id, prompt),
        ImageAction::Set { id, file } => {
            let bytes = fs::read(&file).map_err(|source| CliError::ReadFile {
                path: file.clone(),
                source,
            })?;
            let storage = ctx.storage()?;
            let tasks = storage.load_tree()?;
            let id = resolve_id(&tasks, &id)?;
            let image_id = generate_image_id();
            ctx.blobs().save(&image_id, &bytes)?;

            let previous = previous_image(&tasks, &id);
            let next = tree_ops::update(&tasks, &id, |mut task| {
                task.image = Some(TaskImage::ready(image_id));
                task
            });
            storage.save_tree(&next)?;
            discard_blobs(ctx, previous.as_deref());
            Ok(())
        }
        ImageAction::Clear { id } => {
            let storage = ctx.storage()?;
            let tasks = storage.load_tree()?;
            let id = resolve_id(&tasks, &id)?;
            let previous = previous_image(&tasks, &id);
            let next = tree_ops::update(&tasks, &id, |mut task| {
                task.image = None;
                task
            });
            storage.save_tree(&next)?;
            discard_blobs(ctx, previous.as_deref());
            Ok(())
        }
    }
}

fn previous_image(tasks: &[crate::model::task::Task], id: &str) -> Option<String> {
    tree_ops::find(tasks, id)
        .and_then(|t| t.image.as_ref())
        .map(|img| img.image_id.clone())
}

fn generate(ctx: &Context, given: &str, prompt: Option<String>) -> Result<(), CliError> {
    let storage = ctx.storage()?;
    let tasks = storage.load_tree()?;
    let id = resolve_id(&tasks, given)?;
    let generator = HttpImageGenerator::from_config(&ctx.config.service)?;
    let prompt = prompt
        .or_else(|| image_gen::prompt_for(&tasks, &id))
        .unwrap_or_default();

    let (pending, image_id, previous) =
        image_gen::begin(&tasks, &id).ok_or_else(|| CliError::NotFound(given.to_string()))?;
    storage.save_tree(&pending)?;
    discard_blobs(ctx, previous.as_deref());

    let blobs = ctx.blobs();
    let policy = RetryPolicy::from_config(&ctx.config.service);
    info!(task = %id, image = %image_id, "generating image");
    let event = runtime()?.block_on(image_gen::generate(
        &generator, &blobs, &id, &image_id, &prompt, &policy,
    ));

    let latest = storage.load_tree()?;
    let applied = apply_event(&latest, &event, ctx.config.tasks.default_duration);
    if applied.applied {
        storage.save_tree(&applied.tasks)?;
    }

    match event {
        TreeEvent::ImageReady { .. } if applied.applied => {
            match blobs.url(&image_id)? {
                Some(url) => println!("{}", url),
                None => println!("{}", image_id),
            }
            Ok(())
        }
        TreeEvent::ImageReady { .. } => {
            discard_blobs(ctx, Some(image_id.as_str()));
            println!("task changed while generating; image discarded");
            Ok(())
        }
        _ => Err(CliError::ImageFailed(policy.max_attempts)),
    }
}
