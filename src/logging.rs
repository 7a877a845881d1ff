use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "TASKER_LOG";

/// Pick the filter: `TASKER_LOG` when set and valid, else `fallback`.
pub fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr.
pub fn init_stderr(fallback: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(fallback))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log to a file, for while the play screen owns the terminal. Falls back
/// to stderr when the file cannot be opened.
pub fn init_file(fallback: &str, path: &Path) {
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            init_stderr(fallback);
            tracing::warn!(path = %path.display(), error = %e, "could not open log file");
            return;
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(fallback))
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}
