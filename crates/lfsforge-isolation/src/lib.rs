//! Isolation Manager: selects an execution mode from a
//! recipe (with global override), wraps a phase's shell invocation
//! accordingly, and owns the chroot virtual-filesystem mount lifecycle.

pub mod error;
pub mod mode;
pub mod mounts;
pub mod session;
pub mod wrapper;

pub use error::IsolationError;
pub use mode::{resolve_mode, PathToolProbe, ResolvedMode, ToolProbe};
pub use mounts::MountStack;
pub use session::{ChrootSession, SessionState};

use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use lfsforge_config::ExecMode;
use lfsforge_lock::LockRegistry;
use lfsforge_runner::CommandSpec;

/// Coordinates mode resolution and (for `chroot`) a single shared session
/// per target root. The engine holds one `IsolationManager` for the whole
/// run and calls [`IsolationManager::wrap_phase`] once per phase
/// execution.
pub struct IsolationManager {
    locks: Arc<LockRegistry>,
    probe: Box<dyn ToolProbe>,
    chroot_root: Option<Utf8PathBuf>,
    session: Mutex<Option<ChrootSession>>,
}

impl IsolationManager {
    pub fn new(locks: Arc<LockRegistry>, chroot_root: Option<Utf8PathBuf>) -> Self {
        Self {
            locks,
            probe: Box::new(PathToolProbe),
            chroot_root,
            session: Mutex::new(None),
        }
    }

    #[cfg(test)]
    fn with_probe(
        locks: Arc<LockRegistry>,
        chroot_root: Option<Utf8PathBuf>,
        probe: Box<dyn ToolProbe>,
    ) -> Self {
        Self {
            locks,
            probe,
            chroot_root,
            session: Mutex::new(None),
        }
    }

    /// Resolves the mode for one phase and wraps `cmd` accordingly. `cmd`
    /// must already be the `sh -c '<script>'` invocation the Phase Runner
    /// builds; `script` is the same text, needed verbatim for the chroot
    /// wrapper file. For `Chroot`, ensures the shared session is mounted
    /// (mounting it on first use) before wrapping.
    pub fn wrap_phase(
        &self,
        recipe_mode: ExecMode,
        global_override: ExecMode,
        cmd: CommandSpec,
        script: &str,
    ) -> Result<CommandSpec, IsolationError> {
        let resolved = resolve_mode(recipe_mode, global_override, self.probe.as_ref());

        if resolved != ResolvedMode::Chroot {
            return wrapper::wrap(resolved, cmd, script, None);
        }

        let root = self
            .chroot_root
            .clone()
            .ok_or_else(|| IsolationError::ModeUnavailable {
                requested: "chroot".to_string(),
                reason: "no chroot_path configured".to_string(),
            })?;

        let mut guard = self.session.lock().expect("isolation session mutex poisoned");
        if guard.is_none() {
            let mut session = ChrootSession::new(root.clone(), self.locks.clone());
            session.mount()?;
            *guard = Some(session);
        } else if guard.as_ref().unwrap().state() == SessionState::Failed {
            return Err(IsolationError::InvalidTransition {
                state: "failed".to_string(),
                action: "wrap_phase (session needs explicit cleanup)".to_string(),
            });
        }

        wrapper::wrap(ResolvedMode::Chroot, cmd, script, Some(root.as_path()))
    }

    /// Tears down the shared chroot session, if one is open. Called on
    /// normal run completion and during cooperative shutdown.
    pub fn shutdown(&self, force: bool) -> Result<(), IsolationError> {
        let mut guard = self.session.lock().expect("isolation session mutex poisoned");
        if let Some(session) = guard.as_mut() {
            if session.state() != SessionState::Idle {
                session.unmount(force)?;
            }
        }
        *guard = None;
        Ok(())
    }

    pub fn chroot_root(&self) -> Option<&Utf8Path> {
        self.chroot_root.as_deref()
    }
}
