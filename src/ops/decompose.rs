use tracing::info;

use crate::io::service::{DecomposeRequest, Decomposer, ServiceError};
use crate::model::task::Task;
use crate::ops::events::TreeEvent;
use crate::ops::tree_ops;

/// Describe `id` for the decomposition service: its title, its parent's name
/// and the named siblings it shares a list with. Top-level tasks are sent
/// without context. `None` when the task does not exist.
pub fn build_request(tasks: &[Task], id: &str) -> Option<DecomposeRequest> {
    let task = tree_ops::find(tasks, id)?;
    let Some(parent) = tree_ops::find_parent(tasks, id) else {
        return Some(DecomposeRequest::new(task.name.clone(), None, Vec::new()));
    };
    let parent_context = Some(parent.name.clone()).filter(|n| !n.is_empty());
    let siblings = parent
        .subtasks
        .iter()
        .filter(|s| s.id != id && !s.name.is_empty())
        .map(|s| s.name.clone())
        .collect();
    Some(DecomposeRequest::new(task.name.clone(), parent_context, siblings))
}

/// Ask the service to split `id`. The result is an event to apply to the
/// tree as it is when the answer arrives; `Ok(None)` means the task was
/// not found.
pub async fn request_subtasks<D>(service: &D, tasks: &[Task], id: &str) -> Result<Option<TreeEvent>, ServiceError>
where
    D: Decomposer + ?Sized,
{
    let Some(request) = build_request(tasks, id) else {
        return Ok(None);
    };
    let titles = service.decompose(&request).await?;
    info!(task = id, count = titles.len(), "decomposed");
    Ok(Some(TreeEvent::SubtasksProposed {
        parent_id: id.to_string(),
        titles,
    }))
}
