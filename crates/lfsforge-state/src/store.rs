use anyhow::{Context, Result};
use lfsforge_fslayout::FsLayout;
use lfsforge_lock::{Acquisition, LockKey, LockRegistry};
use lfsforge_utils::atomic_write::write_file_atomic;

use crate::model::PackageState;

/// One of the four phase groups a package's state is tracked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseGroup {
    Fetch,
    Extract,
    Build,
    Install,
}

impl PhaseGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseGroup::Fetch => "fetch",
            PhaseGroup::Extract => "extract",
            PhaseGroup::Build => "build",
            PhaseGroup::Install => "install",
        }
    }
}

/// Per-package durable record store, scoped to one
/// [`PhaseGroup`]. Reads are lock-free; writes go through the
/// `(phase, pkg)` lock so a package has at most one active writer.
#[derive(Debug, Clone)]
pub struct StateStore {
    layout: FsLayout,
    locks: LockRegistry,
    group: PhaseGroup,
}

impl StateStore {
    pub fn new(layout: FsLayout, locks: LockRegistry, group: PhaseGroup) -> Self {
        Self {
            layout,
            locks,
            group,
        }
    }

    /// A package with no state file is *never attempted*.
    pub fn read(&self, pkg: &str) -> Result<Option<PackageState>> {
        let path = self.layout.state_file(self.group.as_str(), pkg);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path.as_std_path())
            .with_context(|| format!("failed to read state file: {path}"))?;
        let state: PackageState = serde_yaml::from_str(&text)
            .with_context(|| format!("invalid state file: {path}"))?;
        Ok(Some(state))
    }

    /// Atomic write, serialized by the per-package lock for this phase
    /// group.
    pub fn write(&self, pkg: &str, state: &PackageState) -> Result<()> {
        let key = LockKey::new(self.group.as_str(), pkg);
        let handle = match self.locks.try_acquire(&key)? {
            Acquisition::Acquired(h) => h,
            Acquisition::Busy => {
                anyhow::bail!("state write blocked: lock for {:?}/{} is held", self.group, pkg)
            }
        };

        let path = self.layout.state_file(self.group.as_str(), pkg);
        let yaml = serde_yaml::to_string(state).context("failed to serialize package state")?;
        write_file_atomic(&path, &yaml)
            .with_context(|| format!("failed to write state file: {path}"))?;

        handle.release().context("failed to release state lock")?;
        Ok(())
    }

    /// Concatenate every per-package state for this phase group into one
    /// document under a top-level grouping, and persist it at
    /// `<root>/state/<phase>.yml`.
    pub fn merge_snapshot(&self) -> Result<Vec<PackageState>> {
        let dir = self
            .layout
            .config()
            .state_dir()
            .join(format!("{}.d", self.group.as_str()));

        let mut states = Vec::new();
        if dir.as_std_path().is_dir() {
            let mut entries: Vec<_> = std::fs::read_dir(dir.as_std_path())?
                .collect::<Result<Vec<_>, std::io::Error>>()?;
            entries.sort_by_key(|e| e.path());
            for entry in entries {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "yml") {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let state: PackageState = serde_yaml::from_str(&text)
                        .with_context(|| format!("invalid state file {}", path.display()))?;
                    states.push(state);
                }
            }
        }

        let snapshot_path = self.layout.merged_state_file(self.group.as_str());
        let yaml =
            serde_yaml::to_string(&states).context("failed to serialize merged snapshot")?;
        write_file_atomic(&snapshot_path, &yaml)
            .with_context(|| format!("failed to write merged snapshot: {snapshot_path}"))?;

        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use lfsforge_config::Config;
    use lfsforge_core::Status;

    fn store_in(dir: &std::path::Path, group: PhaseGroup) -> StateStore {
        let root = Utf8PathBuf::from_path_buf(dir.to_path_buf()).unwrap();
        let cfg = Config {
            root,
            ..Config::default()
        };
        let layout = FsLayout::new(cfg);
        let locks = LockRegistry::new(layout.clone());
        StateStore::new(layout, locks, group)
    }

    #[test]
    fn read_returns_none_when_never_attempted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), PhaseGroup::Build);
        assert!(store.read("gcc").unwrap().is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), PhaseGroup::Build);
        let state = PackageState::new("gcc", Status::Ok, "make");
        store.write("gcc", &state).unwrap();

        let read_back = store.read("gcc").unwrap().unwrap();
        assert_eq!(read_back.package, "gcc");
        assert_eq!(read_back.status, Status::Ok);
    }

    #[test]
    fn merge_snapshot_concatenates_all_packages_in_group() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), PhaseGroup::Fetch);
        store
            .write("binutils", &PackageState::new("binutils", Status::Ok, "fetch"))
            .unwrap();
        store
            .write("gcc", &PackageState::new("gcc", Status::Failed, "fetch").with_reason("timeout"))
            .unwrap();

        let snapshot = store.merge_snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().any(|s| s.package == "binutils"));
        assert!(snapshot.iter().any(|s| s.package == "gcc" && s.status == Status::Failed));
    }

    #[test]
    fn separate_phase_groups_do_not_share_state() {
        let dir = tempfile::tempdir().unwrap();
        let fetch_store = store_in(dir.path(), PhaseGroup::Fetch);
        let build_store = store_in(dir.path(), PhaseGroup::Build);

        fetch_store
            .write("gcc", &PackageState::new("gcc", Status::Ok, "fetch"))
            .unwrap();
        assert!(build_store.read("gcc").unwrap().is_none());
    }
}
