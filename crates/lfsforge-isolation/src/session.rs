//! Per-chroot-session state machine: `idle → mounting →
//! ready → running → unmounting → idle`, with `failed` an absorbing state
//! reached from any non-idle state on I/O error. `failed` requires
//! explicit cleanup back to `idle` before the session can be reused.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use lfsforge_lock::LockRegistry;

use crate::error::IsolationError;
use crate::mounts::MountStack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Mounting,
    Ready,
    Running,
    Unmounting,
    Failed,
}

impl SessionState {
    fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Mounting => "mounting",
            SessionState::Ready => "ready",
            SessionState::Running => "running",
            SessionState::Unmounting => "unmounting",
            SessionState::Failed => "failed",
        }
    }
}

/// A chroot target root's mount lifecycle, serialized against every other
/// mutating operation by the Lock Registry's global lock.
pub struct ChrootSession {
    root: Utf8PathBuf,
    locks: Arc<LockRegistry>,
    state: SessionState,
    mounts: MountStack,
}

impl ChrootSession {
    pub fn new(root: Utf8PathBuf, locks: Arc<LockRegistry>) -> Self {
        Self {
            root,
            locks,
            state: SessionState::Idle,
            mounts: MountStack::new(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `idle → mounting → ready`. Mount failures land the session in
    /// `failed` and return the triggering error.
    pub fn mount(&mut self) -> Result<(), IsolationError> {
        self.require(SessionState::Idle, "mount")?;
        self.state = SessionState::Mounting;

        let guard = self.locks.acquire_global().map_err(|e| {
            self.state = SessionState::Failed;
            IsolationError::MountFailed {
                target: self.root.to_string(),
                reason: e.to_string(),
            }
        })?;

        let result = self.mounts.mount_all(&self.root);
        guard.release().ok();

        match result {
            Ok(()) => {
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// `ready → running`, for the duration a phase command actually runs
    /// inside the chroot.
    pub fn enter_running(&mut self) -> Result<(), IsolationError> {
        self.require(SessionState::Ready, "enter running")?;
        self.state = SessionState::Running;
        Ok(())
    }

    /// `running → ready`, once the phase command returns.
    pub fn leave_running(&mut self) -> Result<(), IsolationError> {
        self.require(SessionState::Running, "leave running")?;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// `ready → unmounting → idle`. Accepts `force` from `ready` or
    /// `failed` alike, since a failed session still needs its (possibly
    /// partial) mount stack torn down before reuse.
    pub fn unmount(&mut self, force: bool) -> Result<(), IsolationError> {
        if !matches!(self.state, SessionState::Ready | SessionState::Failed) {
            return Err(IsolationError::InvalidTransition {
                state: self.state.as_str().to_string(),
                action: "unmount".to_string(),
            });
        }
        self.state = SessionState::Unmounting;

        let guard = self.locks.acquire_global().map_err(|e| {
            self.state = SessionState::Failed;
            IsolationError::UnmountFailed {
                target: self.root.to_string(),
                reason: e.to_string(),
            }
        })?;
        let result = self.mounts.unwind(force);
        guard.release().ok();

        match result {
            Ok(()) => {
                self.state = SessionState::Idle;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    fn require(&self, expected: SessionState, action: &str) -> Result<(), IsolationError> {
        if self.state != expected {
            return Err(IsolationError::InvalidTransition {
                state: self.state.as_str().to_string(),
                action: action.to_string(),
            });
        }
        Ok(())
    }
}
