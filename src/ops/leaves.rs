//! Flattening subtrees into ordered runs of leaves.
//!
//! Order is a pre-order, left-to-right walk honouring each task's own
//! `subtasks` order. Filtering out done leaves never reorders what is left.

use crate::model::task::{Task, TaskStatus};

/// Leaves under `task` (or `task` itself when it is a leaf), as snapshots.
pub fn collect_leaves(task: &Task, include_done: bool) -> Vec<Task> {
    let mut out = Vec::new();
    push_leaves(task, include_done, &mut out);
    out
}

/// Leaves still waiting to be played.
pub fn collect_incomplete_leaves(task: &Task) -> Vec<Task> {
    collect_leaves(task, false)
}

/// Leaves of several subtrees, concatenated in list order.
pub fn collect_leaves_of(tasks: &[Task], include_done: bool) -> Vec<Task> {
    let mut out = Vec::new();
    for task in tasks {
        push_leaves(task, include_done, &mut out);
    }
    out
}

fn push_leaves(task: &Task, include_done: bool, out: &mut Vec<Task>) {
    if task.subtasks.is_empty() {
        if include_done || task.status != TaskStatus::Done {
            out.push(task.clone());
        }
        return;
    }
    for child in &task.subtasks {
        push_leaves(child, include_done, out);
    }
}

/// `(completed, total)` over the leaves below `task`. A leaf counts itself.
pub fn count_completed_leaves(task: &Task) -> (usize, usize) {
    let all = collect_leaves(task, true);
    let completed = all.iter().filter(|t| t.status == TaskStatus::Done).count();
    (completed, all.len())
}
