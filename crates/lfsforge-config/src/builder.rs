use camino::Utf8PathBuf;

use crate::model::{ArchiveType, Config, ExecMode};

impl Config {
    /// Builder for programmatic configuration, for embedders that don't
    /// want file discovery or CLI parsing at all.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent builder over [`Config`], for tests and embedding.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    cfg: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: Config::default(),
        }
    }

    pub fn root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.cfg.root = root.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.cfg.concurrency = n.max(1);
        self
    }

    pub fn default_phase_timeout_secs(mut self, secs: u64) -> Self {
        self.cfg.default_phase_timeout_secs = secs;
        self
    }

    pub fn default_retries(mut self, n: u32) -> Self {
        self.cfg.default_retries = n;
        self
    }

    pub fn strip_binaries(mut self, strip: bool) -> Self {
        self.cfg.strip_binaries = strip;
        self
    }

    pub fn package_archive_type(mut self, t: ArchiveType) -> Self {
        self.cfg.package_archive_type = t;
        self
    }

    pub fn chroot_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.cfg.chroot_path = Some(path.into());
        self
    }

    pub fn exec_mode(mut self, mode: ExecMode) -> Self {
        self.cfg.exec_mode = mode;
        self
    }

    pub fn build(self) -> Config {
        self.cfg
    }
}
