use std::time::Duration;

use tracing::{debug, error, warn};

use crate::io::blob_store::BlobStore;
use crate::io::service::{ImageGenerator, PollStatus, ServiceError};
use crate::model::config::ServiceConfig;
use crate::model::task::{Task, TaskImage, generate_image_id};
use crate::ops::events::TreeEvent;
use crate::ops::tree_ops;

const BACKOFF_BASE_MS: u64 = 2000;
const BACKOFF_MULTIPLIER: u64 = 2;
const MAX_BACKOFF_MS: u64 = 30_000;

/// Bounds for one image generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Polls per attempt
    pub max_polls: u32,
    pub poll_interval: Duration,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ServiceConfig) -> Self {
        RetryPolicy {
            max_attempts: config.image_max_attempts.max(1),
            max_polls: config.image_max_polls.max(1),
            poll_interval: Duration::from_millis(config.image_poll_interval_ms),
            backoff_base: Duration::from_millis(BACKOFF_BASE_MS),
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = BACKOFF_MULTIPLIER.saturating_pow(attempt.saturating_sub(1));
        let base = u64::try_from(self.backoff_base.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(multiplier).min(MAX_BACKOFF_MS))
    }
}

/// Attach a fresh pending image to `task_id`, replacing any previous one.
/// Returns the new tree, the new image id and the id of the image it
/// replaced. `None` when the task does not exist.
pub fn begin(tasks: &[Task], task_id: &str) -> Option<(Vec<Task>, String, Option<String>)> {
    let previous = tree_ops::find(tasks, task_id)?
        .image
        .as_ref()
        .map(|img| img.image_id.clone());
    let image_id = generate_image_id();
    let pending = TaskImage::generating(image_id.clone());
    let next = tree_ops::update(tasks, task_id, |mut task| {
        task.image = Some(pending);
        task
    });
    Some((next, image_id, previous))
}

/// Prompt sent for a task: its name, with the parent for context.
pub fn prompt_for(tasks: &[Task], task_id: &str) -> Option<String> {
    let task = tree_ops::find(tasks, task_id)?;
    Some(match tree_ops::find_parent(tasks, task_id) {
        Some(parent) if !parent.name.is_empty() => {
            format!("{} (part of: {})", task.display_name(), parent.name)
        }
        _ => task.display_name().to_string(),
    })
}

/// Run the start/poll protocol until an image is stored or the attempts run
/// out. Never fails: the outcome is the event to apply to the tree.
pub async fn generate<G, B>(
    generator: &G,
    blobs: &B,
    task_id: &str,
    image_id: &str,
    prompt: &str,
    policy: &RetryPolicy,
) -> TreeEvent
where
    G: ImageGenerator + ?Sized,
    B: BlobStore + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        match attempt_once(generator, prompt, policy).await {
            Ok((bytes, description)) => match blobs.save(image_id, &bytes) {
                Ok(()) => {
                    debug!(task = task_id, image = image_id, attempt, "image stored");
                    return TreeEvent::ImageReady {
                        task_id: task_id.to_string(),
                        image_id: image_id.to_string(),
                        description,
                    };
                }
                Err(e) => warn!(attempt, error = %e, "could not store image"),
            },
            Err(e) => warn!(attempt, error = %e, "image generation attempt failed"),
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.backoff(attempt)).await;
        }
    }
    error!(task = task_id, attempts = policy.max_attempts, "giving up on image");
    TreeEvent::ImageFailed {
        task_id: task_id.to_string(),
        image_id: image_id.to_string(),
    }
}

async fn attempt_once<G>(
    generator: &G,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<(Vec<u8>, Option<String>), ServiceError>
where
    G: ImageGenerator + ?Sized,
{
    let started = generator.start(prompt).await?;
    for _ in 0..policy.max_polls {
        tokio::time::sleep(policy.poll_interval).await;
        match generator.poll(&started.operation_id).await? {
            PollStatus::Generating => continue,
            PollStatus::Ready(bytes) => return Ok((bytes, started.image_description)),
            PollStatus::Failed(message) => {
                return Err(ServiceError::Rejected {
                    stage: "poll".to_string(),
                    message,
                });
            }
        }
    }
    Err(ServiceError::TimedOut(policy.max_polls))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::blob_store::DirBlobStore;
    use crate::io::service::StartedImage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn instant_policy(max_attempts: u32, max_polls: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            max_polls,
            poll_interval: Duration::ZERO,
            backoff_base: Duration::ZERO,
        }
    }

    /// Plays back a fixed poll script; `start` fails `fail_starts` times first.
    struct Scripted {
        fail_starts: AtomicU32,
        starts: AtomicU32,
        polls: Mutex<Vec<PollStatus>>,
    }

    impl Scripted {
        fn new(fail_starts: u32, mut polls: Vec<PollStatus>) -> Self {
            polls.reverse();
            Scripted {
                fail_starts: AtomicU32::new(fail_starts),
                starts: AtomicU32::new(0),
                polls: Mutex::new(polls),
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for Scripted {
        async fn start(&self, _prompt: &str) -> Result<StartedImage, ServiceError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_starts.load(Ordering::SeqCst) > 0 {
                self.fail_starts.fetch_sub(1, Ordering::SeqCst);
                return Err(ServiceError::Rejected {
                    stage: "start".into(),
                    message: "busy".into(),
                });
            }
            Ok(StartedImage {
                operation_id: "op".into(),
                image_description: Some("desc".into()),
            })
        }

        async fn poll(&self, _operation_id: &str) -> Result<PollStatus, ServiceError> {
            Ok(self
                .polls
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(PollStatus::Generating))
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::from_config(&ServiceConfig::default());
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff(3), Duration::from_millis(8000));
        assert_eq!(policy.backoff(20), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn begin_attaches_pending_reference() {
        let tasks = vec![Task::new("a", "Walk dog", 60)];
        let (next, image_id, previous) = begin(&tasks, "a").unwrap();
        let image = next[0].image.as_ref().unwrap();
        assert_eq!(image.image_id, image_id);
        assert!(image_id.starts_with("img_"));
        assert_eq!(previous, None);
        assert!(begin(&tasks, "zzz").is_none());
    }

    #[test]
    fn prompt_includes_parent() {
        let tasks = vec![Task::new("p", "Garden", 0).with_subtasks(vec![Task::new("c", "Weed", 60)])];
        assert_eq!(prompt_for(&tasks, "c").unwrap(), "Weed (part of: Garden)");
        assert_eq!(prompt_for(&tasks, "p").unwrap(), "Garden");
    }

    #[tokio::test]
    async fn ready_after_polling_stores_blob() {
        let tmp = TempDir::new().unwrap();
        let blobs = DirBlobStore::new(tmp.path());
        let generator = Scripted::new(
            0,
            vec![PollStatus::Generating, PollStatus::Ready(b"png".to_vec())],
        );
        let event = generate(&generator, &blobs, "t", "img_1", "x", &instant_policy(3, 5)).await;
        assert_eq!(
            event,
            TreeEvent::ImageReady {
                task_id: "t".into(),
                image_id: "img_1".into(),
                description: Some("desc".into()),
            }
        );
        assert!(blobs.url("img_1").unwrap().is_some());
    }

    #[tokio::test]
    async fn retries_after_failed_start() {
        let tmp = TempDir::new().unwrap();
        let blobs = DirBlobStore::new(tmp.path());
        let generator = Scripted::new(2, vec![PollStatus::Ready(b"png".to_vec())]);
        let event = generate(&generator, &blobs, "t", "img_1", "x", &instant_policy(3, 5)).await;
        assert!(matches!(event, TreeEvent::ImageReady { .. }));
        assert_eq!(generator.starts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let tmp = TempDir::new().unwrap();
        let blobs = DirBlobStore::new(tmp.path());
        let generator = Scripted::new(0, vec![PollStatus::Failed("nsfw".into())]);
        let event = generate(&generator, &blobs, "t", "img_1", "x", &instant_policy(2, 3)).await;
        assert_eq!(
            event,
            TreeEvent::ImageFailed {
                task_id: "t".into(),
                image_id: "img_1".into(),
            }
        );
        assert_eq!(generator.starts.load(Ordering::SeqCst), 2);
        assert!(blobs.url("img_1").unwrap().is_none());
    }
}
