use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default phase timeout in seconds.
const DEFAULT_PHASE_TIMEOUT_SECS: u64 = 2 * 60 * 60;

/// Execution mode override for the Isolation Manager.
/// `Auto` defers to each recipe's own `build.mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    #[default]
    Auto,
    Direct,
    Fakeroot,
    Chroot,
}

/// Package archive format written by the packaging phase. Defaults to
/// `.tar.xz`; kept configurable since the underlying archiver (`tar` +
/// a compression filter) supports other filters too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveType {
    #[default]
    TarXz,
    TarGz,
    TarBz2,
}

impl ArchiveType {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveType::TarXz => "tar.xz",
            ArchiveType::TarGz => "tar.gz",
            ArchiveType::TarBz2 => "tar.bz2",
        }
    }
}

/// The flat configuration mapping consumed at startup: roots, concurrency,
/// default timeout, default retry count, strip-binaries flag, package
/// archive type, chroot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory under which `sources/`, `build/`, `packages/`,
    /// `state/`, `logs/` are materialized.
    pub root: Utf8PathBuf,
    /// Directory recipes are loaded from.
    pub recipes_dir: Utf8PathBuf,
    /// Directory hook scripts referenced by name are resolved against.
    pub hooks_dir: Utf8PathBuf,
    /// Worker pool size for the Scheduler. Defaults to host CPU count.
    pub concurrency: usize,
    /// Default wall-clock timeout for a phase, in seconds. Stored as seconds, not `Duration`, so it maps
    /// onto a plain TOML integer.
    pub default_phase_timeout_secs: u64,
    /// Default retry count for fetch and phase execution.
    pub default_retries: u32,
    /// Whether `strip --strip-unneeded` runs over destdir by default.
    pub strip_binaries: bool,
    /// Archive format for packaged artifacts.
    pub package_archive_type: ArchiveType,
    /// Target root a `chroot` execution mode chroots into, if any.
    pub chroot_path: Option<Utf8PathBuf>,
    /// Global execution-mode override; `Auto` means "use each recipe's
    /// own `build.mode`".
    pub exec_mode: ExecMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from(".lfsforge"),
            recipes_dir: Utf8PathBuf::from("recipes"),
            hooks_dir: Utf8PathBuf::from("hooks"),
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            default_phase_timeout_secs: DEFAULT_PHASE_TIMEOUT_SECS,
            default_retries: 3,
            strip_binaries: true,
            package_archive_type: ArchiveType::default(),
            chroot_path: None,
            exec_mode: ExecMode::Auto,
        }
    }
}

impl Config {
    pub fn sources_dir(&self) -> Utf8PathBuf {
        self.root.join("sources")
    }

    pub fn corrupted_dir(&self) -> Utf8PathBuf {
        self.sources_dir().join(".corrupted")
    }

    pub fn build_dir(&self) -> Utf8PathBuf {
        self.root.join("build")
    }

    pub fn packages_dir(&self) -> Utf8PathBuf {
        self.root.join("packages")
    }

    pub fn state_dir(&self) -> Utf8PathBuf {
        self.root.join("state")
    }

    pub fn lock_dir(&self) -> Utf8PathBuf {
        self.state_dir().join("locks")
    }

    pub fn logs_dir(&self) -> Utf8PathBuf {
        self.root.join("logs")
    }

    pub fn default_phase_timeout(&self) -> Duration {
        Duration::from_secs(self.default_phase_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_cpu_count_for_concurrency() {
        let cfg = Config::default();
        assert!(cfg.concurrency >= 1);
    }

    #[test]
    fn paths_nest_under_root() {
        let cfg = Config {
            root: Utf8PathBuf::from("/tmp/lfs"),
            ..Config::default()
        };
        assert_eq!(cfg.sources_dir(), Utf8PathBuf::from("/tmp/lfs/sources"));
        assert_eq!(
            cfg.corrupted_dir(),
            Utf8PathBuf::from("/tmp/lfs/sources/.corrupted")
        );
        assert_eq!(cfg.lock_dir(), Utf8PathBuf::from("/tmp/lfs/state/locks"));
    }
}
