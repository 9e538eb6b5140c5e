//! Per-server advisory locking
//!
//! Materialization and execution of one server directory are serialized
//! through an advisory lock on `<serverDir>/.mcpadre.lock`. `run` takes a
//! shared lock (many concurrent runs are fine), `install` takes an
//! exclusive lock. Cross-server concurrency is unrestricted.

use std::fs::{File, OpenOptions};
use std::time::Duration;

use backoff::ExponentialBackoff;
use fs2::FileExt;

use crate::error::{Error, Result};
use crate::path::NormalizedPath;

/// How the lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Multiple holders allowed; used by `run`.
    Shared,
    /// Single holder; used by `install` and `upgrade`.
    Exclusive,
}

/// A held advisory lock on a server directory.
///
/// The OS releases the lock when the file handle is dropped.
#[derive(Debug)]
pub struct ServerLock {
    file: File,
    path: NormalizedPath,
    mode: LockMode,
}

impl ServerLock {
    /// Acquire a lock on the given lock-file path, retrying with
    /// exponential backoff up to `timeout`.
    pub fn acquire(path: &NormalizedPath, mode: LockMode, timeout: Duration) -> Result<Self> {
        let native = path.to_native();
        if let Some(parent) = native.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&native)
            .map_err(|e| Error::io(&native, e))?;

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(timeout),
            ..ExponentialBackoff::default()
        };

        let try_once = || {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            attempt.map_err(|_| {
                backoff::Error::transient(Error::LockTimeout {
                    path: native.clone(),
                })
            })
        };

        backoff::retry(policy, try_once).map_err(|e| match e {
            backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
        })?;

        tracing::debug!(path = %path.as_str(), ?mode, "acquired server lock");
        Ok(Self {
            file,
            path: path.clone(),
            mode,
        })
    }

    /// Acquire with the default 10 second timeout.
    pub fn acquire_default(path: &NormalizedPath, mode: LockMode) -> Result<Self> {
        Self::acquire(path, mode, Duration::from_secs(10))
    }

    /// The mode this lock was taken in.
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for ServerLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.as_str(), "failed to release server lock: {e}");
        }
    }
}
