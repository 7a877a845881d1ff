use std::path::Path;
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::io::store::{STATS_KEY, TASKS_KEY};

/// Which stored document changed on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Tasks,
    Statistics,
}

/// Watches the data directory for writes made by other `tk` processes.
pub struct StoreWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<StoreEvent>,
}

impl StoreWatcher {
    pub fn start(data_dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let dir = data_dir.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for path in event.paths {
                    if let Some(kind) = classify(&dir, &path) {
                        let _ = tx.send(kind);
                    }
                }
            },
            Config::default(),
        )?;

        watcher.watch(data_dir, RecursiveMode::NonRecursive)?;
        Ok(StoreWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain pending events, collapsing duplicates. Call once per tick.
    pub fn poll(&self) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            if !events.contains(&evt) {
                events.push(evt);
            }
        }
        events
    }
}

fn classify(dir: &Path, path: &Path) -> Option<StoreEvent> {
    if path.parent() != Some(dir) {
        return None;
    }
    let name = path.file_name()?.to_str()?;
    let key = name.strip_suffix(".json")?;
    match key {
        TASKS_KEY => Some(StoreEvent::Tasks),
        STATS_KEY => Some(StoreEvent::Statistics),
        _ => None,
    }
}
