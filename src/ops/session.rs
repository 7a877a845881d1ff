//! The execution session as an explicit state machine.
//!
//! A session is either `Idle` or `Active` with a queue of leaf snapshots, a
//! position in it, and an anchor naming the top-level task(s) the queue was
//! built from. Every transition takes the live tree and returns the next
//! session together with the (possibly edited) tree; nothing here persists.
//!
//! Queued snapshots go stale as soon as anything else edits the tree, so each
//! navigation first re-resolves the queue by id against the live tree:
//! vanished tasks drop out, leaves that grew subtasks are replaced by their
//! own leaves, and (going forward only) finished leaves are skipped.

use tracing::debug;

use crate::model::task::{Task, TaskStatus};
use crate::ops::leaves::{collect_incomplete_leaves, collect_leaves, collect_leaves_of};
use crate::ops::tree_ops::{self, is_subtree_done};

/// Which part of the top-level list the current queue came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// One top-level task's subtree
    Task(String),
    /// A run of consecutive top-level tasks, `first` through `last`
    Run { first: String, last: String },
}

impl Anchor {
    /// The earliest top-level task covered; retreating past the queue start
    /// goes to its predecessor.
    pub fn first(&self) -> &str {
        match self {
            Anchor::Task(id) => id,
            Anchor::Run { first, .. } => first,
        }
    }

    /// The latest top-level task covered; advancing past the queue end
    /// searches after it.
    pub fn last(&self) -> &str {
        match self {
            Anchor::Task(id) => id,
            Anchor::Run { last, .. } => last,
        }
    }
}

/// Where the session stands inside its queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// On the entry at this index
    At(usize),
    /// Between entries: the current task was completed and dropped, and the
    /// next advance lands on whatever now sits at this index.
    Before(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    queue: Vec<Task>,
    position: Position,
    anchor: Anchor,
}

impl ActiveSession {
    pub fn queue(&self) -> &[Task] {
        &self.queue
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// The task on screen, if the session is sitting on one
    pub fn current(&self) -> Option<&Task> {
        match self.position {
            Position::At(i) => self.queue.get(i),
            Position::Before(_) => None,
        }
    }

    /// Index used for "n of m" displays
    pub fn index(&self) -> usize {
        match self.position {
            Position::At(i) | Position::Before(i) => i,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Idle,
    Active(ActiveSession),
}

/// Result of a transition
#[derive(Debug, Clone)]
pub struct Step {
    pub session: Session,
    pub tasks: Vec<Task>,
    /// Whether `tasks` differs from the tree the transition was given
    pub tree_changed: bool,
}

impl Step {
    fn unchanged(session: Session, tasks: &[Task]) -> Self {
        Step {
            session,
            tasks: tasks.to_vec(),
            tree_changed: false,
        }
    }
}

/// A queue entry after re-resolving against the live tree; `origin` is the
/// index of the stale entry it came from.
struct Entry {
    origin: usize,
    task: Task,
}

fn reconcile(queue: &[Task], tasks: &[Task], include_done: bool) -> Vec<Entry> {
    let mut out = Vec::new();
    for (origin, queued) in queue.iter().enumerate() {
        let Some(live) = tree_ops::find(tasks, &queued.id) else {
            continue;
        };
        for task in collect_leaves(live, include_done) {
            out.push(Entry { origin, task });
        }
    }
    out
}

fn into_queue(entries: Vec<Entry>) -> Vec<Task> {
    entries.into_iter().map(|e| e.task).collect()
}

/// First top-level task after `after_id` with work left. If `after_id` has
/// vanished from the tree, the search covers the whole list.
fn next_incomplete_top_level<'a>(tasks: &'a [Task], after_id: &str) -> Option<&'a Task> {
    let start = tasks
        .iter()
        .position(|t| t.id == after_id)
        .map_or(0, |i| i + 1);
    tasks[start..].iter().find(|t| !is_subtree_done(t))
}

fn previous_top_level<'a>(tasks: &'a [Task], before_id: &str) -> Option<&'a Task> {
    let index = tasks.iter().position(|t| t.id == before_id)?;
    index.checked_sub(1).and_then(|i| tasks.get(i))
}

/// Start a session on `task`'s incomplete leaves.
fn activate(task: &Task) -> Session {
    let queue = collect_incomplete_leaves(task);
    if queue.is_empty() {
        return Session::Idle;
    }
    Session::Active(ActiveSession {
        queue,
        position: Position::At(0),
        anchor: Anchor::Task(task.id.clone()),
    })
}

impl Session {
    pub fn is_active(&self) -> bool {
        matches!(self, Session::Active(_))
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match self {
            Session::Active(active) => Some(active),
            Session::Idle => None,
        }
    }

    pub fn current(&self) -> Option<&Task> {
        self.active().and_then(ActiveSession::current)
    }

    /// Start on the first top-level task that still has open leaves.
    pub fn start(tasks: &[Task]) -> Step {
        let session = tasks
            .iter()
            .find(|t| !is_subtree_done(t))
            .map_or(Session::Idle, activate);
        if let Some(current) = session.current() {
            debug!(task = %current.id, "session started");
        }
        Step::unchanged(session, tasks)
    }

    /// Start on a specific task the user picked.
    ///
    /// Inside a parent, the run covers the parent's open leaves from the
    /// picked task onward. At top level, it covers the picked task and every
    /// top-level task after it. Earlier open leaves are never pulled in. A
    /// finished task is reopened first so there is something to play.
    pub fn start_from(tasks: &[Task], id: &str) -> Step {
        let Some(picked) = tree_ops::find(tasks, id) else {
            return Step::unchanged(Session::Idle, tasks);
        };

        let reopen = picked.status == TaskStatus::Done || is_subtree_done(picked);
        let tasks = if reopen {
            tree_ops::reopen(tasks, id)
        } else {
            tasks.to_vec()
        };
        let Some(picked) = tree_ops::find(&tasks, id) else {
            return Step::unchanged(Session::Idle, &tasks);
        };
        let Some(first_leaf) = collect_leaves(picked, true).into_iter().next() else {
            return Step::unchanged(Session::Idle, &tasks);
        };

        let (scope, anchor) = match tree_ops::find_parent(&tasks, id) {
            Some(parent) => {
                let top = tree_ops::find_top_level(&tasks, id).map_or(id, |t| t.id.as_str());
                (collect_leaves(parent, true), Anchor::Task(top.to_string()))
            }
            None => {
                let start = tasks.iter().position(|t| t.id == id).unwrap_or(0);
                let run = &tasks[start..];
                let anchor = match run.last() {
                    Some(last) if run.len() > 1 => Anchor::Run {
                        first: id.to_string(),
                        last: last.id.clone(),
                    },
                    _ => Anchor::Task(id.to_string()),
                };
                (collect_leaves_of(run, true), anchor)
            }
        };

        let begin = scope
            .iter()
            .position(|t| t.id == first_leaf.id)
            .unwrap_or(0);
        let queue: Vec<Task> = scope
            .into_iter()
            .skip(begin)
            .filter(|t| t.status != TaskStatus::Done)
            .collect();

        let session = if queue.is_empty() {
            Session::Idle
        } else {
            debug!(task = %id, queued = queue.len(), "session started from pick");
            Session::Active(ActiveSession {
                queue,
                position: Position::At(0),
                anchor,
            })
        };
        Step {
            session,
            tasks,
            tree_changed: reopen,
        }
    }

    /// Move to the leaf after the current one in the reconciled queue. When
    /// the current leaf is gone from it (completed here or elsewhere, or
    /// deleted) the queue restarts at its first open leaf, so skipped leaves
    /// come back around. Crosses into later top-level tasks when the queue
    /// runs out and returns to `Idle` when nothing is left anywhere.
    pub fn advance(&self, tasks: &[Task]) -> Step {
        let Session::Active(active) = self else {
            return Step::unchanged(Session::Idle, tasks);
        };

        let entries = reconcile(&active.queue, tasks, false);
        let current = match active.position {
            Position::At(i) => active.queue.get(i).map(|t| t.id.as_str()),
            Position::Before(_) => None,
        };
        let index = current
            .and_then(|id| entries.iter().position(|e| e.task.id == id))
            .map_or(0, |found| found + 1);

        if index < entries.len() {
            let session = Session::Active(ActiveSession {
                queue: into_queue(entries),
                position: Position::At(index),
                anchor: active.anchor.clone(),
            });
            return Step::unchanged(session, tasks);
        }

        match next_incomplete_top_level(tasks, active.anchor.last()) {
            Some(task) => {
                debug!(anchor = %task.id, "advancing into next top-level task");
                Step::unchanged(activate(task), tasks)
            }
            None => {
                debug!("no tasks left, session exhausted");
                Step::unchanged(Session::Idle, tasks)
            }
        }
    }

    /// Step back one leaf, done ones included, crossing into the previous
    /// top-level task at the queue start. A finished target is reopened
    /// (with its ancestors) so it can be played again. Stays put when there
    /// is nowhere to go.
    pub fn retreat(&self, tasks: &[Task]) -> Step {
        let Session::Active(active) = self else {
            return Step::unchanged(Session::Idle, tasks);
        };

        let mut entries = reconcile(&active.queue, tasks, true);
        let bound = active.index();
        if let Some(index) = entries.iter().rposition(|e| e.origin < bound) {
            let target_id = entries[index].task.id.clone();
            let (tasks, tree_changed) = reopen_if_done(tasks, &entries[index].task);
            if tree_changed
                && let Some(live) = tree_ops::find(&tasks, &target_id)
            {
                entries[index].task = live.clone();
            }
            let session = Session::Active(ActiveSession {
                queue: into_queue(entries),
                position: Position::At(index),
                anchor: active.anchor.clone(),
            });
            return Step {
                session,
                tasks,
                tree_changed,
            };
        }

        let Some(previous) = previous_top_level(tasks, active.anchor.first()) else {
            return Step::unchanged(self.clone(), tasks);
        };
        let mut queue = collect_leaves(previous, true);
        let Some(last) = queue.last().cloned() else {
            return Step::unchanged(self.clone(), tasks);
        };
        debug!(anchor = %previous.id, "retreating into previous top-level task");
        let anchor = Anchor::Task(previous.id.clone());
        let (tasks, tree_changed) = reopen_if_done(tasks, &last);
        if let Some(live) = tree_ops::find(&tasks, &last.id)
            && let Some(slot) = queue.last_mut()
        {
            *slot = live.clone();
        }
        let position = Position::At(queue.len() - 1);
        Step {
            session: Session::Active(ActiveSession {
                queue,
                position,
                anchor,
            }),
            tasks,
            tree_changed,
        }
    }

    /// Whether [`Session::retreat`] would move anywhere. Does not touch state.
    pub fn can_retreat(&self, tasks: &[Task]) -> bool {
        let Session::Active(active) = self else {
            return false;
        };
        let bound = active.index();
        reconcile(&active.queue, tasks, true)
            .iter()
            .any(|e| e.origin < bound)
            || previous_top_level(tasks, active.anchor.first()).is_some()
    }

    /// Mark the current task done, propagate to its ancestors and drop it
    /// from the queue. The session is left between entries so the next
    /// [`Session::advance`] picks the following open leaf. Also returns the
    /// completed task as it now stands in the tree.
    pub fn complete_current(&self, tasks: &[Task]) -> (Step, Option<Task>) {
        let Session::Active(active) = self else {
            return (Step::unchanged(Session::Idle, tasks), None);
        };
        let Position::At(index) = active.position else {
            return (Step::unchanged(self.clone(), tasks), None);
        };

        let Some(id) = active.queue.get(index).map(|t| t.id.clone()) else {
            return (Step::unchanged(self.clone(), tasks), None);
        };
        let found = tree_ops::find(tasks, &id).is_some();
        let next_tasks = if found {
            tree_ops::complete(tasks, &id)
        } else {
            tasks.to_vec()
        };
        let completed = tree_ops::find(&next_tasks, &id).cloned();

        let mut queue = active.queue.clone();
        queue.remove(index);
        let session = Session::Active(ActiveSession {
            queue,
            position: Position::Before(index),
            anchor: active.anchor.clone(),
        });
        debug!(task = %id, "completed current task");
        (
            Step {
                session,
                tasks: next_tasks,
                tree_changed: found,
            },
            completed,
        )
    }
}

fn reopen_if_done(tasks: &[Task], target: &Task) -> (Vec<Task>, bool) {
    if target.status == TaskStatus::Done {
        (tree_ops::reopen(tasks, &target.id), true)
    } else {
        (tasks.to_vec(), false)
    }
}
