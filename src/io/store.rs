//! Persistence of the task tree and the statistics record.
//!
//! Everything goes through the [`KeyValueStore`] port: two string keys, each
//! holding one JSON document. [`FileStore`] keeps them as `<key>.json` files
//! in the data directory; [`MemoryStore`] backs tests.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::io::lock::{LockError, StoreLock};
use crate::model::stats::TaskStatistics;
use crate::model::task::Task;
use crate::ops::tree_ops::reconcile_parent_completion_on_load;

pub const TASKS_KEY: &str = "tasker-tasks";
pub const STATS_KEY: &str = "tasker-statistics";

/// Directory name searched for when no data directory is given
pub const DATA_DIR_NAME: &str = ".tasker";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{key} holds malformed JSON: {source}")]
    Malformed {
        key: String,
        source: serde_json::Error,
    },
    #[error("could not encode {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("store rejected write to {0}")]
    Rejected(String),
}

/// String-keyed document store
pub trait KeyValueStore {
    /// `None` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(FileStore {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    /// Written to a temp file in the same directory and renamed over the
    /// target while holding the directory lock.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let _lock = StoreLock::acquire_default(&self.dir)?;
        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(value.as_bytes()).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        debug!(key, bytes = value.len(), "stored");
        Ok(())
    }
}

/// Resolve the data directory: an explicit path (flag or `TASKER_DIR`)
/// wins, then the nearest `.tasker` directory walking up from `cwd`, and
/// finally `./.tasker` (created on first write).
pub fn resolve_data_dir(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    let mut current = cwd.to_path_buf();
    loop {
        let candidate = current.join(DATA_DIR_NAME);
        if candidate.is_dir() {
            return candidate;
        }
        if !current.pop() {
            return cwd.join(DATA_DIR_NAME);
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `set` fail, to exercise write-failure paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected(key.to_string()));
        }
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Typed access
// ---------------------------------------------------------------------------

/// Typed view over a [`KeyValueStore`]
#[derive(Debug)]
pub struct Storage<K> {
    store: K,
}

impl<K: KeyValueStore> Storage<K> {
    pub fn new(store: K) -> Self {
        Storage { store }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// Load the tree and repair parents whose whole subtree is done. A
    /// repaired tree is written back straight away.
    pub fn load_tree(&self) -> Result<Vec<Task>, StoreError> {
        let Some(text) = self.store.get(TASKS_KEY)? else {
            return Ok(Vec::new());
        };
        let tasks: Vec<Task> = parse(TASKS_KEY, &text)?;
        let repaired = reconcile_parent_completion_on_load(&tasks);
        if repaired != tasks {
            info!("marked finished parents done on load");
            self.save_tree(&repaired)?;
        }
        Ok(repaired)
    }

    pub fn save_tree(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.store.set(TASKS_KEY, &encode(TASKS_KEY, &tasks)?)
    }

    /// Load the counters. Records written before unlocks were tracked get an
    /// empty unlock list, persisted immediately.
    pub fn load_stats(&self) -> Result<TaskStatistics, StoreError> {
        let Some(text) = self.store.get(STATS_KEY)? else {
            return Ok(TaskStatistics::default());
        };
        let raw: serde_json::Value = parse(STATS_KEY, &text)?;
        let legacy = raw.get("unlockedAchievements").is_none();
        let stats: TaskStatistics =
            serde_json::from_value(raw).map_err(|source| StoreError::Malformed {
                key: STATS_KEY.to_string(),
                source,
            })?;
        if legacy {
            info!("upgrading statistics record");
            self.save_stats(&stats)?;
        }
        Ok(stats)
    }

    pub fn save_stats(&self, stats: &TaskStatistics) -> Result<(), StoreError> {
        self.store.set(STATS_KEY, &encode(STATS_KEY, stats)?)
    }
}

fn parse<T: serde::de::DeserializeOwned>(key: &str, text: &str) -> Result<T, StoreError> {
    serde_json::from_str(text).map_err(|source| StoreError::Malformed {
        key: key.to_string(),
        source,
    })
}

fn encode<T: serde::Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })
}
