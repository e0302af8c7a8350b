//! Installer: applies a built package's artifact tarball
//! into a target root, taking a pre-image backup first and rolling back
//! to it on any failure.

mod backup;
mod verify;

use camino::Utf8Path;
use chrono::Utc;
use lfsforge_core::{InstallError, Status};
use lfsforge_fslayout::FsLayout;
use lfsforge_lock::{Acquisition, LockKey, LockRegistry};
use lfsforge_state::{PackageState, PhaseGroup, StateStore};

/// What happened when [`Installer::install`] was asked to run, short of
/// an outright error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Extracted and verified.
    Installed,
    /// The install state for this package already recorded `ok`.
    AlreadyInstalled,
    /// Another installer holds this package's install lock.
    Busy,
}

pub struct Installer {
    locks: LockRegistry,
    state: StateStore,
}

impl Installer {
    pub fn new(layout: FsLayout, locks: LockRegistry) -> Self {
        let state = StateStore::new(layout, locks.clone(), PhaseGroup::Install);
        Self { locks, state }
    }

    /// `install(pkg_artifact, target_root)`. `pkg` keys
    /// the install-phase lock and state record; `artifact` is the
    /// packaged `.tar.xz` (or configured archive type) produced by the
    /// Pipeline Engine's packaging edge.
    pub fn install(
        &self,
        pkg: &str,
        artifact: &Utf8Path,
        target_root: &Utf8Path,
    ) -> Result<InstallOutcome, InstallError> {
        self.install_with(pkg, artifact, target_root, false)
    }

    /// As [`Installer::install`], but `force` bypasses the "already
    /// recorded ok" skip (CLI `install` without `--continue`).
    pub fn install_with(
        &self,
        pkg: &str,
        artifact: &Utf8Path,
        target_root: &Utf8Path,
        force: bool,
    ) -> Result<InstallOutcome, InstallError> {
        let key = LockKey::new("install", pkg);
        let guard = match self.locks.try_acquire(&key).map_err(|e| InstallError::Io(
            std::io::Error::other(e.to_string()),
        ))? {
            Acquisition::Acquired(h) => h,
            Acquisition::Busy => return Ok(InstallOutcome::Busy),
        };

        if !force {
            if let Some(state) = self.read_state(pkg)? {
                if state.status == Status::Ok {
                    guard.release().ok();
                    return Ok(InstallOutcome::AlreadyInstalled);
                }
            }
        }

        let result = self.install_locked(pkg, artifact, target_root);
        guard.release().ok();
        result
    }

    fn install_locked(
        &self,
        pkg: &str,
        artifact: &Utf8Path,
        target_root: &Utf8Path,
    ) -> Result<InstallOutcome, InstallError> {
        std::fs::create_dir_all(target_root.as_std_path())?;
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.fZ");
        let backup_dir = target_root
            .join(".backup")
            .join(format!("{pkg}-{timestamp}"));

        backup::snapshot(target_root, &backup_dir)?;

        let attempt_start = std::time::SystemTime::now();
        let outcome = self
            .extract_and_verify(pkg, artifact, target_root, attempt_start)
            .and_then(|()| {
                self.write_state(pkg, Status::Ok, None)?;
                Ok(InstallOutcome::Installed)
            });

        if outcome.is_err() {
            if let Err(restore_err) = backup::restore(target_root, &backup_dir) {
                tracing::error!(
                    pkg,
                    %restore_err,
                    "rollback from pre-image snapshot failed after install failure"
                );
            }
        }

        outcome
    }

    fn extract_and_verify(
        &self,
        pkg: &str,
        artifact: &Utf8Path,
        target_root: &Utf8Path,
        attempt_start: std::time::SystemTime,
    ) -> Result<(), InstallError> {
        lfsforge_extract::extract(artifact, target_root).map_err(|e| {
            let reason = e.to_string();
            let _ = self.write_state(pkg, Status::Failed, Some(reason.clone()));
            InstallError::PackageFailed {
                package: pkg.to_string(),
                reason,
            }
        })?;

        if !verify::has_recent_files(target_root, attempt_start)? {
            let reason = "no new files with recent mtime found under target root".to_string();
            let _ = self.write_state(pkg, Status::Failed, Some(reason.clone()));
            return Err(InstallError::InstallVerificationFailed {
                package: pkg.to_string(),
                target_root: target_root.to_string(),
                reason,
            });
        }

        Ok(())
    }

    /// Runs only the verification predicate against an already-installed
    /// target root, without (re-)extracting the artifact. Does not consult or update install
    /// state; a caller who wants resume semantics checks that separately.
    pub fn verify_only(&self, target_root: &Utf8Path) -> Result<bool, InstallError> {
        Ok(verify::has_recent_files(
            target_root,
            std::time::SystemTime::UNIX_EPOCH,
        )?)
    }

    fn read_state(&self, pkg: &str) -> Result<Option<PackageState>, InstallError> {
        self.state
            .read(pkg)
            .map_err(|e| InstallError::Io(std::io::Error::other(e.to_string())))
    }

    fn write_state(
        &self,
        pkg: &str,
        status: Status,
        reason: Option<String>,
    ) -> Result<(), InstallError> {
        let mut state = PackageState::new(pkg, status, "install");
        if let Some(reason) = reason {
            state = state.with_reason(reason);
        }
        self.state
            .write(pkg, &state)
            .map_err(|e| InstallError::Io(std::io::Error::other(e.to_string())))
    }
}
