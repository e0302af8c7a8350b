//! FS Layout Manager: the single component that
//! constructs absolute paths. Every other component asks this crate for
//! a path rather than joining strings itself.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use chrono::Utc;
use lfsforge_config::Config;

/// The per-package workspace triple:
/// `src` (extracted sources), `build` (out-of-tree build dir, may equal
/// `src`), `destdir` (staged install root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub src: Utf8PathBuf,
    pub build: Utf8PathBuf,
    pub destdir: Utf8PathBuf,
}

/// Materializes and resolves the canonical directory tree.
#[derive(Debug, Clone)]
pub struct FsLayout {
    cfg: Config,
}

impl FsLayout {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Create every top-level directory the pipeline needs. Idempotent.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.cfg.sources_dir(),
            self.cfg.corrupted_dir(),
            self.cfg.build_dir(),
            self.cfg.packages_dir(),
            self.cfg.state_dir(),
            self.cfg.lock_dir(),
            self.cfg.logs_dir(),
        ] {
            std::fs::create_dir_all(dir.as_std_path())
                .with_context(|| format!("failed to create directory: {dir}"))?;
        }
        Ok(())
    }

    /// The ephemeral workspace triple for `pkg`, creating the three
    /// directories.
    pub fn workspace(&self, pkg: &str) -> Result<Workspace> {
        let root = self.cfg.build_dir().join(pkg);
        let ws = Workspace {
            src: root.join("src"),
            build: root.join("build"),
            destdir: root.join("destdir"),
        };
        for dir in [&ws.src, &ws.build, &ws.destdir] {
            std::fs::create_dir_all(dir.as_std_path())
                .with_context(|| format!("failed to create workspace dir: {dir}"))?;
        }
        Ok(ws)
    }

    /// The root directory backing a package's workspace triple
    /// (`<buildroot>/<pkg>`, containing `src`/`build`/`destdir`).
    pub fn workspace_root(&self, pkg: &str) -> Utf8PathBuf {
        self.cfg.build_dir().join(pkg)
    }

    /// Remove a package's workspace entirely, so the next attempt starts
    /// clean.
    pub fn scrub_workspace(&self, pkg: &str) -> Result<()> {
        let root = self.workspace_root(pkg);
        if root.as_std_path().exists() {
            std::fs::remove_dir_all(root.as_std_path())
                .with_context(|| format!("failed to remove workspace: {root}"))?;
        }
        Ok(())
    }

    /// The sources cache dir for `pkg`.
    pub fn sources(&self, pkg: &str) -> Utf8PathBuf {
        self.cfg.sources_dir().join(pkg)
    }

    /// Move a partial/corrupted artifact into the quarantine dir under a
    /// timestamped name. Best-effort: if the source no longer exists this is
    /// a no-op so a retry loop never fails on a double-quarantine.
    pub fn corrupted_quarantine(&self, path: &Utf8PathBuf) -> Result<Option<Utf8PathBuf>> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let corrupted = self.cfg.corrupted_dir();
        std::fs::create_dir_all(corrupted.as_std_path())
            .with_context(|| format!("failed to create quarantine dir: {corrupted}"))?;

        let basename = path.file_name().unwrap_or("artifact");
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let dest = corrupted.join(format!("{basename}.{timestamp}"));
        std::fs::rename(path.as_std_path(), dest.as_std_path())
            .with_context(|| format!("failed to quarantine {path} to {dest}"))?;
        Ok(Some(dest))
    }

    /// Destination path for a package's archive and sidecar checksum file.
    pub fn package_artifact(&self, name: &str, version: &str, extension: &str) -> Utf8PathBuf {
        self.cfg
            .packages_dir()
            .join(format!("{name}-{version}.{extension}"))
    }

    pub fn package_checksum_sidecar(&self, artifact: &Utf8PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{artifact}.sha256"))
    }

    /// Per-phase captured-output log path.
    pub fn phase_log(&self, pkg: &str, phase: &str) -> Utf8PathBuf {
        self.cfg.logs_dir().join(pkg).join(format!("{phase}.log"))
    }

    /// Per-package state file path, where `phase` is one of
    /// `{fetch, extract, build, install}`.
    pub fn state_file(&self, phase_dir: &str, pkg: &str) -> Utf8PathBuf {
        self.cfg
            .state_dir()
            .join(format!("{phase_dir}.d"))
            .join(format!("{pkg}.yml"))
    }

    /// Merged-snapshot path.
    pub fn merged_state_file(&self, phase_dir: &str) -> Utf8PathBuf {
        self.cfg.state_dir().join(format!("{phase_dir}.yml"))
    }

    /// Advisory lock file path.
    pub fn lock_file(&self, phase: &str, pkg: &str) -> Utf8PathBuf {
        self.cfg.lock_dir().join(format!("{phase}-{pkg}.lock"))
    }

    pub fn global_lock_file(&self) -> Utf8PathBuf {
        self.cfg.lock_dir().join(".global.lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_in(dir: &std::path::Path) -> FsLayout {
        let root = Utf8PathBuf::from_path_buf(dir.to_path_buf()).unwrap();
        FsLayout::new(Config {
            root,
            ..Config::default()
        })
    }

    #[test]
    fn ensure_creates_all_top_level_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        layout.ensure().unwrap();
        assert!(layout.config().sources_dir().as_std_path().is_dir());
        assert!(layout.config().lock_dir().as_std_path().is_dir());
    }

    #[test]
    fn workspace_creates_src_build_destdir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let ws = layout.workspace("gcc").unwrap();
        assert!(ws.src.as_std_path().is_dir());
        assert!(ws.build.as_std_path().is_dir());
        assert!(ws.destdir.as_std_path().is_dir());
    }

    #[test]
    fn scrub_removes_workspace_directory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let ws = layout.workspace("gcc").unwrap();
        layout.scrub_workspace("gcc").unwrap();
        assert!(!ws.src.as_std_path().exists());
    }

    #[test]
    fn quarantine_moves_file_to_timestamped_name_under_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let src_path = layout.sources("gcc");
        std::fs::create_dir_all(src_path.as_std_path()).unwrap();
        let artifact = src_path.join("gcc-1.tar.gz");
        std::fs::write(artifact.as_std_path(), b"partial").unwrap();

        let quarantined = layout.corrupted_quarantine(&artifact).unwrap().unwrap();
        assert!(!artifact.as_std_path().exists());
        assert!(quarantined.as_std_path().exists());
        assert!(quarantined.starts_with(layout.config().corrupted_dir()));
    }

    #[test]
    fn quarantine_is_noop_when_source_missing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let missing = layout.sources("nope").join("gone.tar.gz");
        assert_eq!(layout.corrupted_quarantine(&missing).unwrap(), None);
    }

    #[test]
    fn state_file_paths_follow_layout_convention() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let path = layout.state_file("build", "gcc");
        assert!(path.as_str().ends_with("state/build.d/gcc.yml"));
    }
}
