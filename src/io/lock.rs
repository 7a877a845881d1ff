use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

const LOCK_FILE: &str = ".lock";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Exclusive advisory lock on a data directory, held while a store key is
/// rewritten so the CLI and a running play screen never interleave writes.
///
/// The lock file itself is left in place; only the flock is released on drop.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out waiting for {path}; another tk process is writing")]
    Timeout { path: PathBuf },
}

impl StoreLock {
    /// Block up to `timeout` waiting for the lock.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = data_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        let start = Instant::now();
        let mut waited = false;
        loop {
            if try_lock(&file).is_ok() {
                return Ok(StoreLock { _file: file, path });
            }
            if start.elapsed() >= timeout {
                return Err(LockError::Timeout { path });
            }
            if !waited {
                debug!(path = %path.display(), "waiting for store lock");
                waited = true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    pub fn acquire_default(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(data_dir, DEFAULT_TIMEOUT)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
