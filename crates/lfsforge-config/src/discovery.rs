use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use serde::Deserialize;
use std::path::Path;

use crate::model::Config;

/// CLI-sourced overrides; `None` fields fall through to the config file
/// or built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Option<Utf8PathBuf>,
    pub concurrency: Option<usize>,
    pub strip_binaries: Option<bool>,
    pub chroot_path: Option<Utf8PathBuf>,
}

/// Partial TOML document; every field optional so an incomplete config
/// file only overrides what it names.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    root: Option<Utf8PathBuf>,
    recipes_dir: Option<Utf8PathBuf>,
    hooks_dir: Option<Utf8PathBuf>,
    concurrency: Option<usize>,
    default_phase_timeout_secs: Option<u64>,
    default_retries: Option<u32>,
    strip_binaries: Option<bool>,
    package_archive_type: Option<crate::model::ArchiveType>,
    chroot_path: Option<Utf8PathBuf>,
    exec_mode: Option<crate::model::ExecMode>,
}

impl Config {
    /// Discover config starting at the current directory.
    pub fn discover(cli: &CliOverrides) -> Result<Self> {
        let start_dir = std::env::current_dir().context("failed to get current directory")?;
        Self::discover_from(&start_dir, cli)
    }

    /// Discover config starting at `start_dir`; separated from
    /// [`Config::discover`] so tests never depend on process CWD.
    pub fn discover_from(start_dir: &Path, cli: &CliOverrides) -> Result<Self> {
        let mut cfg = Config::default();

        if let Some(path) = find_config_file(start_dir) {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            let toml: TomlConfig = toml::from_str(&text)
                .with_context(|| format!("invalid config file: {}", path.display()))?;
            apply_toml(&mut cfg, toml);
        }

        apply_cli(&mut cfg, cli);
        Ok(cfg)
    }
}

fn apply_toml(cfg: &mut Config, toml: TomlConfig) {
    if let Some(v) = toml.root {
        cfg.root = v;
    }
    if let Some(v) = toml.recipes_dir {
        cfg.recipes_dir = v;
    }
    if let Some(v) = toml.hooks_dir {
        cfg.hooks_dir = v;
    }
    if let Some(v) = toml.concurrency {
        cfg.concurrency = v;
    }
    if let Some(v) = toml.default_phase_timeout_secs {
        cfg.default_phase_timeout_secs = v;
    }
    if let Some(v) = toml.default_retries {
        cfg.default_retries = v;
    }
    if let Some(v) = toml.strip_binaries {
        cfg.strip_binaries = v;
    }
    if let Some(v) = toml.package_archive_type {
        cfg.package_archive_type = v;
    }
    if let Some(v) = toml.chroot_path {
        cfg.chroot_path = Some(v);
    }
    if let Some(v) = toml.exec_mode {
        cfg.exec_mode = v;
    }
}

fn apply_cli(cfg: &mut Config, cli: &CliOverrides) {
    if let Some(v) = &cli.root {
        cfg.root = v.clone();
    }
    if let Some(v) = cli.concurrency {
        cfg.concurrency = v;
    }
    if let Some(v) = cli.strip_binaries {
        cfg.strip_binaries = v;
    }
    if let Some(v) = &cli.chroot_path {
        cfg.chroot_path = Some(v.clone());
    }
}

/// Walk upward from `start_dir` looking for `.lfsforge/config.toml`.
fn find_config_file(start_dir: &Path) -> Option<std::path::PathBuf> {
    let mut dir = Some(start_dir.to_path_buf());
    while let Some(d) = dir {
        let candidate = d.join(".lfsforge").join("config.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent().map(|p| p.to_path_buf());
    }
    None
}
