//! Results of asynchronous work, applied to whatever the tree looks like
//! when they arrive rather than to the tree they were started from.

use tracing::debug;

use crate::model::task::{ImageStatus, Task, TaskImage, TaskStatus};
use crate::ops::tree_ops;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// Decomposition finished; titles in the order they should be appended.
    SubtasksProposed { parent_id: String, titles: Vec<String> },
    /// The blob for `image_id` has been stored.
    ImageReady {
        task_id: String,
        image_id: String,
        description: Option<String>,
    },
    /// Generation gave up; the pending reference should go.
    ImageFailed { task_id: String, image_id: String },
}

/// Outcome of [`apply_event`]
#[derive(Debug, Clone)]
pub struct Applied {
    pub tasks: Vec<Task>,
    /// `false` when the target task (or the pending image it referred to) is
    /// gone and nothing changed.
    pub applied: bool,
}

pub fn apply_event(tasks: &[Task], event: &TreeEvent, default_duration: u64) -> Applied {
    let unchanged = || Applied {
        tasks: tasks.to_vec(),
        applied: false,
    };
    match event {
        TreeEvent::SubtasksProposed { parent_id, titles } => {
            if tree_ops::find(tasks, parent_id).is_none() {
                debug!(parent_id, "decomposition target vanished");
                return unchanged();
            }
            let mut next = tasks.to_vec();
            for title in titles {
                let child = Task::new(Task::generate_id(), title.trim(), default_duration);
                next = tree_ops::add_child(&next, parent_id, child);
            }
            // New open leaves under a finished parent reopen its ancestry.
            if !titles.is_empty()
                && tree_ops::find(&next, parent_id).is_some_and(|p| p.status == TaskStatus::Done)
            {
                next = tree_ops::reopen_ancestry(&next, parent_id);
            }
            Applied {
                tasks: next,
                applied: true,
            }
        }
        TreeEvent::ImageReady {
            task_id,
            image_id,
            description,
        } => {
            if !has_pending(tasks, task_id, image_id) {
                return unchanged();
            }
            let description = description.clone();
            let image_id = image_id.clone();
            Applied {
                tasks: tree_ops::update(tasks, task_id, |mut task| {
                    task.image = Some(TaskImage {
                        image_id,
                        status: ImageStatus::Ready,
                        description,
                    });
                    task
                }),
                applied: true,
            }
        }
        TreeEvent::ImageFailed { task_id, image_id } => {
            if !has_pending(tasks, task_id, image_id) {
                return unchanged();
            }
            Applied {
                tasks: tree_ops::update(tasks, task_id, |mut task| {
                    task.image = None;
                    task
                }),
                applied: true,
            }
        }
    }
}

fn has_pending(tasks: &[Task], task_id: &str, image_id: &str) -> bool {
    tree_ops::find(tasks, task_id)
        .and_then(|t| t.image.as_ref())
        .is_some_and(|img| img.image_id == image_id)
}
