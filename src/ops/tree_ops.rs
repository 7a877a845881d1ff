//! Structural operations on the task tree.
//!
//! The tree is a persistent value: every write takes `&[Task]` and returns a
//! new `Vec<Task>`, leaving the input untouched. Callers commit by replacing
//! their root with the returned value, so a reader never sees a half-applied
//! edit. An id that is not in the tree makes every operation a no-op.

use crate::model::task::{Task, TaskStatus};

/// Direction for [`move_sibling`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Depth-first search over the whole tree.
pub fn find<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    for task in tasks {
        if task.id == id {
            return Some(task);
        }
        if let Some(found) = find(&task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

/// Direct parent of `id`; `None` for top-level or unknown ids.
pub fn find_parent<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    let path = locate(tasks, id)?;
    let (_, parent_path) = path.split_last()?;
    node_at(tasks, parent_path)
}

/// The list that directly contains `id` (the root list or a parent's
/// subtasks). Empty when `id` is unknown.
pub fn find_siblings<'a>(tasks: &'a [Task], id: &str) -> &'a [Task] {
    let Some(path) = locate(tasks, id) else {
        return &[];
    };
    match path.split_last() {
        Some((_, [])) => tasks,
        Some((_, parent_path)) => match node_at(tasks, parent_path) {
            Some(parent) => &parent.subtasks,
            None => &[],
        },
        None => &[],
    }
}

/// The top-level task whose subtree contains `id` (itself if top-level).
pub fn find_top_level<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    let path = locate(tasks, id)?;
    tasks.get(*path.first()?)
}

/// Ancestors of `id`, nearest first.
pub fn ancestors<'a>(tasks: &'a [Task], id: &str) -> Vec<&'a Task> {
    let Some(path) = locate(tasks, id) else {
        return Vec::new();
    };
    (1..path.len())
        .rev()
        .filter_map(|depth| node_at(tasks, &path[..depth]))
        .collect()
}

/// Index path from the root list down to `id`.
pub fn locate(tasks: &[Task], id: &str) -> Option<Vec<usize>> {
    for (i, task) in tasks.iter().enumerate() {
        if task.id == id {
            return Some(vec![i]);
        }
        if let Some(mut rest) = locate(&task.subtasks, id) {
            rest.insert(0, i);
            return Some(rest);
        }
    }
    None
}

fn node_at<'a>(tasks: &'a [Task], path: &[usize]) -> Option<&'a Task> {
    let (first, rest) = path.split_first()?;
    let task = tasks.get(*first)?;
    if rest.is_empty() {
        Some(task)
    } else {
        node_at(&task.subtasks, rest)
    }
}

fn node_at_mut<'a>(tasks: &'a mut [Task], path: &[usize]) -> Option<&'a mut Task> {
    let (first, rest) = path.split_first()?;
    let task = tasks.get_mut(*first)?;
    if rest.is_empty() {
        Some(task)
    } else {
        node_at_mut(&mut task.subtasks, rest)
    }
}

fn list_at_mut<'a>(tasks: &'a mut Vec<Task>, parent_path: &[usize]) -> Option<&'a mut Vec<Task>> {
    if parent_path.is_empty() {
        return Some(tasks);
    }
    node_at_mut(tasks, parent_path).map(|p| &mut p.subtasks)
}

// ---------------------------------------------------------------------------
// Copy-on-write edits
// ---------------------------------------------------------------------------

/// Replace the node `id` with `transform(node)`.
pub fn update(tasks: &[Task], id: &str, transform: impl FnOnce(Task) -> Task) -> Vec<Task> {
    let mut next = tasks.to_vec();
    if let Some(path) = locate(tasks, id)
        && let Some(slot) = node_at_mut(&mut next, &path)
    {
        let node = std::mem::take(slot);
        *slot = transform(node);
    }
    next
}

/// Remove `id` and its whole subtree.
pub fn delete(tasks: &[Task], id: &str) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| t.id != id)
        .map(|t| {
            if t.subtasks.is_empty() {
                t.clone()
            } else {
                Task {
                    subtasks: delete(&t.subtasks, id),
                    ..t.clone()
                }
            }
        })
        .collect()
}

/// Append `child` to `parent_id`'s subtasks.
pub fn add_child(tasks: &[Task], parent_id: &str, child: Task) -> Vec<Task> {
    update(tasks, parent_id, |mut parent| {
        parent.subtasks.push(child);
        parent
    })
}

/// Append a new top-level task.
pub fn add_top_level(tasks: &[Task], task: Task) -> Vec<Task> {
    let mut next = tasks.to_vec();
    next.push(task);
    next
}

/// Swap `id` with its neighbour in its containing list. No-op at either end.
pub fn move_sibling(tasks: &[Task], id: &str, direction: Direction) -> Vec<Task> {
    let mut next = tasks.to_vec();
    let Some(path) = locate(tasks, id) else {
        return next;
    };
    let Some((&index, parent_path)) = path.split_last() else {
        return next;
    };
    if let Some(list) = list_at_mut(&mut next, parent_path) {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&i| i < list.len()),
        };
        if let Some(target) = target {
            list.swap(index, target);
        }
    }
    next
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Set `done` on the task and every descendant.
pub fn mark_subtree_done(task: Task) -> Task {
    set_subtree_status(task, TaskStatus::Done)
}

/// Set `to-do` on the task and every descendant.
pub fn mark_subtree_todo(task: Task) -> Task {
    set_subtree_status(task, TaskStatus::Todo)
}

fn set_subtree_status(mut task: Task, status: TaskStatus) -> Task {
    task.status = status;
    task.subtasks = task
        .subtasks
        .into_iter()
        .map(|t| set_subtree_status(t, status))
        .collect();
    task
}

/// The canonical completion rule: a leaf is done when its status says so, a
/// parent when all of its children are. A parent's own `status` field is a
/// cache of this and can lag behind until propagation runs.
pub fn is_subtree_done(task: &Task) -> bool {
    if task.subtasks.is_empty() {
        task.status == TaskStatus::Done
    } else {
        task.subtasks.iter().all(is_subtree_done)
    }
}

/// Walk up from the parent of `from_id`, marking each fully-done ancestor
/// `done`. Stops at the first ancestor that still has open work.
pub fn propagate_completion_upward(tasks: &[Task], from_id: &str) -> Vec<Task> {
    let mut next = tasks.to_vec();
    let Some(path) = locate(tasks, from_id) else {
        return next;
    };
    for depth in (1..path.len()).rev() {
        let Some(ancestor) = node_at_mut(&mut next, &path[..depth]) else {
            break;
        };
        if !is_subtree_done(ancestor) {
            break;
        }
        if ancestor.status != TaskStatus::Done {
            let node = std::mem::take(ancestor);
            *ancestor = mark_subtree_done(node);
        }
    }
    next
}

/// Mark `id` (and its subtree) done, then propagate upward.
pub fn complete(tasks: &[Task], id: &str) -> Vec<Task> {
    let marked = update(tasks, id, mark_subtree_done);
    propagate_completion_upward(&marked, id)
}

/// Make `id` actionable again: its subtree goes back to `to-do` and so does
/// every ancestor, since none of them can be complete any more.
pub fn reopen(tasks: &[Task], id: &str) -> Vec<Task> {
    let Some(path) = locate(tasks, id) else {
        return tasks.to_vec();
    };
    let mut next = update(tasks, id, mark_subtree_todo);
    for depth in 1..path.len() {
        if let Some(ancestor) = node_at_mut(&mut next, &path[..depth]) {
            ancestor.status = TaskStatus::Todo;
        }
    }
    next
}

/// Mark `id` and its ancestors `to-do`, leaving the rest of its subtree as
/// it is. Used when an open child lands under a finished task.
pub fn reopen_ancestry(tasks: &[Task], id: &str) -> Vec<Task> {
    let Some(path) = locate(tasks, id) else {
        return tasks.to_vec();
    };
    let mut next = tasks.to_vec();
    for depth in 1..=path.len() {
        if let Some(node) = node_at_mut(&mut next, &path[..depth]) {
            node.status = TaskStatus::Todo;
        }
    }
    next
}

/// Load-time repair: wherever a subtree is fully done but its root says
/// otherwise, mark it done all the way down. Runs to a fixed point, so a
/// second application never changes anything.
pub fn reconcile_parent_completion_on_load(tasks: &[Task]) -> Vec<Task> {
    let mut next = tasks.to_vec();
    loop {
        let mut changed = false;
        for task in next.iter_mut() {
            changed |= repair(task);
        }
        if !changed {
            return next;
        }
    }
}

fn repair(task: &mut Task) -> bool {
    let mut changed = false;
    for child in task.subtasks.iter_mut() {
        changed |= repair(child);
    }
    if !task.subtasks.is_empty() && task.status != TaskStatus::Done && is_subtree_done(task) {
        let node = std::mem::take(task);
        *task = mark_subtree_done(node);
        changed = true;
    }
    changed
}

/// Commit an edited name, trimming it and falling back when it ends up empty.
pub fn commit_name(tasks: &[Task], id: &str, name: &str, fallback: &str) -> Vec<Task> {
    let trimmed = name.trim();
    let name = if trimmed.is_empty() { fallback } else { trimmed };
    update(tasks, id, |mut task| {
        task.name = name.to_string();
        task
    })
}

pub fn set_duration(tasks: &[Task], id: &str, seconds: u64) -> Vec<Task> {
    update(tasks, id, |mut task| {
        task.duration = seconds;
        task
    })
}

/// Every task in pre-order, with its depth.
pub fn walk(tasks: &[Task]) -> Vec<(usize, &Task)> {
    fn go<'a>(tasks: &'a [Task], depth: usize, out: &mut Vec<(usize, &'a Task)>) {
        for task in tasks {
            out.push((depth, task));
            go(&task.subtasks, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    go(tasks, 0, &mut out);
    out
}
