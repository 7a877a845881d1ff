//! The play loop: owns the live tree, the statistics record and the session,
//! and commits every change through the store.
//!
//! Persistence here is best effort. A failed write is logged and the
//! in-memory state stays authoritative.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::io::store::{KeyValueStore, Storage, StoreError};
use crate::model::accomplishment::{Accomplishment, find_accomplishment};
use crate::model::stats::{CompletionEntry, TaskStatistics};
use crate::model::task::Task;
use crate::ops::achievements;
use crate::ops::session::{Session, Step};
use crate::ops::stats_ops;

/// What finishing the current task produced
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// The task as it stands in the tree after completion
    pub task: Task,
    pub entry: CompletionEntry,
    /// Catalog entries unlocked by this completion, in catalog order
    pub unlocked: Vec<&'static Accomplishment>,
}

pub struct SessionNavigator<K> {
    storage: Storage<K>,
    tasks: Vec<Task>,
    stats: TaskStatistics,
    session: Session,
    completions_this_session: u32,
}

impl<K: KeyValueStore> SessionNavigator<K> {
    /// Load tree and statistics (repairing both as needed) and start idle.
    pub fn load(storage: Storage<K>) -> Result<Self, StoreError> {
        let tasks = storage.load_tree()?;
        let stats = storage.load_stats()?;
        Ok(Self::with_state(storage, tasks, stats))
    }

    pub fn with_state(storage: Storage<K>, tasks: Vec<Task>, stats: TaskStatistics) -> Self {
        SessionNavigator {
            storage,
            tasks,
            stats,
            session: Session::Idle,
            completions_this_session: 0,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn stats(&self) -> &TaskStatistics {
        &self.stats
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current(&self) -> Option<&Task> {
        self.session.current()
    }

    pub fn storage(&self) -> &Storage<K> {
        &self.storage
    }

    pub fn completions_this_session(&self) -> u32 {
        self.completions_this_session
    }

    /// Start on the first top-level task with open leaves.
    pub fn start(&mut self) -> Option<&Task> {
        let step = Session::start(&self.tasks);
        self.completions_this_session = 0;
        self.apply(step);
        self.current()
    }

    /// Start on a task the user picked, reopening it if it was finished.
    pub fn start_from(&mut self, id: &str) -> Option<&Task> {
        let step = Session::start_from(&self.tasks, id);
        self.completions_this_session = 0;
        self.apply(step);
        self.current()
    }

    /// `None` once the whole list is exhausted; the session is idle then.
    pub fn advance(&mut self) -> Option<&Task> {
        let step = self.session.advance(&self.tasks);
        self.apply(step);
        if !self.session.is_active() {
            info!(completed = self.completions_this_session, "session exhausted");
        }
        self.current()
    }

    pub fn retreat(&mut self) -> Option<&Task> {
        let step = self.session.retreat(&self.tasks);
        self.apply(step);
        self.current()
    }

    pub fn can_retreat(&self) -> bool {
        self.session.can_retreat(&self.tasks)
    }

    /// Finish the current task. A completion counts toward the streak when
    /// an earlier task was already completed in this session.
    pub fn complete_current(&mut self, actual_time: u64, at: NaiveDateTime) -> Option<CompletionOutcome> {
        let is_consecutive = self.completions_this_session > 0;
        self.complete_current_with(actual_time, at, is_consecutive)
    }

    /// Like [`SessionNavigator::complete_current`] with the streak flag given
    /// explicitly.
    pub fn complete_current_with(
        &mut self,
        actual_time: u64,
        at: NaiveDateTime,
        is_consecutive: bool,
    ) -> Option<CompletionOutcome> {
        let (step, completed) = self.session.complete_current(&self.tasks);
        self.apply(step);
        let task = completed?;

        let entry = CompletionEntry {
            duration: task.effective_duration(),
            actual_time,
            completed_at: at,
            is_consecutive,
        };
        let mut stats = stats_ops::record_completion(&self.stats, &entry);
        let unlocked: Vec<&'static Accomplishment> = achievements::evaluate(&stats)
            .into_iter()
            .filter(|id| achievements::unlock(&mut stats, id))
            .filter_map(find_accomplishment)
            .collect();
        for a in &unlocked {
            info!(id = a.id, title = a.title, "achievement unlocked");
        }
        self.stats = stats;
        self.commit_stats();
        self.completions_this_session += 1;

        Some(CompletionOutcome {
            task,
            entry,
            unlocked,
        })
    }

    /// End the session and break the streak.
    pub fn close(&mut self) {
        self.session = Session::Idle;
        self.completions_this_session = 0;
        if let Some(stats) = stats_ops::reset_consecutive_streak(&self.stats) {
            self.stats = stats;
            self.commit_stats();
        }
    }

    /// Apply an edit to the tree and persist it. The session reconciles
    /// against the new tree on its next move.
    pub fn edit_tree(&mut self, edit: impl FnOnce(&[Task]) -> Vec<Task>) {
        let next = edit(&self.tasks);
        if next != self.tasks {
            self.tasks = next;
            self.commit_tree();
        }
    }

    /// Adopt a tree written by someone else. Not persisted.
    pub fn replace_tree(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Adopt a statistics record written by someone else. Not persisted.
    pub fn replace_stats(&mut self, stats: TaskStatistics) {
        self.stats = stats;
    }

    fn apply(&mut self, step: Step) {
        self.session = step.session;
        if step.tree_changed {
            self.tasks = step.tasks;
            self.commit_tree();
        }
    }

    fn commit_tree(&self) {
        if let Err(e) = self.storage.save_tree(&self.tasks) {
            warn!(error = %e, "could not persist task tree");
        }
    }

    fn commit_stats(&self) {
        if let Err(e) = self.storage.save_stats(&self.stats) {
            warn!(error = %e, "could not persist statistics");
        }
    }
}
