//! Lock Registry: grants exclusive, advisory, inter-process
//! locks keyed by `(phase, package)`, plus a single global lock for
//! destructive fleet-wide operations (mount/unmount batches).
//!
//! Locks are advisory (cooperating processes only), non-reentrant, and
//! process-scoped: a lock is held for the lifetime of the acquiring
//! process unless released explicitly. The underlying primitive is
//! `flock(2)` on a file opened under the Lock Registry's own directory
//! (`FsLayout::lock_file` / `FsLayout::global_lock_file`); `flock` locks
//! attach to the open file description, so closing the file (on drop or
//! explicit release) always releases the lock even if the on-disk file
//! itself is left behind for the next acquirer to reuse.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;

use camino::Utf8PathBuf;
use chrono::Utc;
use lfsforge_fslayout::FsLayout;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to create lock directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open lock file {path}: {source}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error locking {path}: {source}")]
    Lock {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove lock file {path}: {source}")]
    Remove {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Identifies a per-package, per-phase lock, keyed by `(phase, package)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub phase: String,
    pub pkg: String,
}

impl LockKey {
    pub fn new(phase: impl Into<String>, pkg: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            pkg: pkg.into(),
        }
    }
}

/// Outcome of a non-blocking acquisition attempt.
pub enum Acquisition {
    Acquired(LockHandle),
    /// Another process (or another handle in this process) holds the
    /// lock. Not an error: callers are expected to treat `Busy` as a
    /// normal outcome, not a failure.
    Busy,
}

/// An acquired lock. Dropping it releases the underlying `flock`; call
/// [`LockHandle::release`] to also remove the advisory hint file.
pub struct LockHandle {
    path: Utf8PathBuf,
    file: File,
}

impl LockHandle {
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }

    /// Release the lock and remove the advisory lock file.
    pub fn release(self) -> Result<(), LockError> {
        let path = self.path.clone();
        drop(self.file);
        match std::fs::remove_file(path.as_std_path()) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LockError::Remove { path, source }),
        }
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle").field("path", &self.path).finish()
    }
}

/// Grants locks rooted at an [`FsLayout`]'s lock directory.
#[derive(Debug, Clone)]
pub struct LockRegistry {
    layout: FsLayout,
}

impl LockRegistry {
    pub fn new(layout: FsLayout) -> Self {
        Self { layout }
    }

    /// Non-blocking attempt to acquire the `(phase, pkg)` lock.
    pub fn try_acquire(&self, key: &LockKey) -> Result<Acquisition, LockError> {
        let path = self.layout.lock_file(&key.phase, &key.pkg);
        try_acquire_path(path)
    }

    /// Blocking acquire of the `(phase, pkg)` lock. Fails only on I/O
    /// errors against the lock directory.
    pub fn acquire(&self, key: &LockKey) -> Result<LockHandle, LockError> {
        let path = self.layout.lock_file(&key.phase, &key.pkg);
        acquire_path(path)
    }

    /// Non-blocking attempt to acquire the global destructive-op lock.
    pub fn try_acquire_global(&self) -> Result<Acquisition, LockError> {
        try_acquire_path(self.layout.global_lock_file())
    }

    pub fn acquire_global(&self) -> Result<LockHandle, LockError> {
        acquire_path(self.layout.global_lock_file())
    }
}

fn open_lock_file(path: &Utf8PathBuf) -> Result<File, LockError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent.as_std_path()).map_err(|source| LockError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path.as_std_path())
        .map_err(|source| LockError::Open {
            path: path.clone(),
            source,
        })
}

fn try_acquire_path(path: Utf8PathBuf) -> Result<Acquisition, LockError> {
    let file = open_lock_file(&path)?;
    match flock(&file, libc::LOCK_EX | libc::LOCK_NB) {
        Ok(()) => {
            write_hint(&file);
            Ok(Acquisition::Acquired(LockHandle { path, file }))
        }
        Err(e) if e.raw_os_error() == Some(libc::EWOULDBLOCK) => Ok(Acquisition::Busy),
        Err(source) => Err(LockError::Lock { path, source }),
    }
}

fn acquire_path(path: Utf8PathBuf) -> Result<LockHandle, LockError> {
    let file = open_lock_file(&path)?;
    flock(&file, libc::LOCK_EX).map_err(|source| LockError::Lock {
        path: path.clone(),
        source,
    })?;
    write_hint(&file);
    Ok(LockHandle { path, file })
}

fn flock(file: &File, op: libc::c_int) -> io::Result<()> {
    let res = unsafe { libc::flock(file.as_raw_fd(), op) };
    if res == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Best-effort `pid timestamp` hint; non-authoritative, for diagnostics only.
fn write_hint(mut file: &File) {
    let _ = file.set_len(0);
    let _ = file.seek(SeekFrom::Start(0));
    let _ = writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339());
}
