//! Shared fixtures for the end-to-end CLI tests. Every test drives the
//! compiled `lfsforge` binary through [`assert_cmd`] against a throwaway
//! root directory; none of this talks to the network, so fetches are
//! simulated by pre-seeding the sources cache and fetch-state directly.
#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

pub fn lfsforge_cmd() -> Command {
    Command::cargo_bin("lfsforge").expect("lfsforge binary built")
}

/// A throwaway project: `<dir>/recipes`, `<dir>/hooks`, `<dir>/.lfsforge`
/// (state/build/sources/packages root). Every test gets its own so
/// parallel `cargo test` runs never share lock files or state.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("recipes")).unwrap();
        std::fs::create_dir_all(dir.path().join("hooks")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> std::path::PathBuf {
        self.dir.path().join(".lfsforge")
    }

    pub fn recipes_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("recipes")
    }

    pub fn hooks_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("hooks")
    }

    /// Writes `<dir>/recipes/<filename>` verbatim.
    pub fn write_recipe(&self, filename: &str, yaml: &str) {
        std::fs::write(self.recipes_dir().join(filename), yaml).unwrap();
    }

    /// A config file that roots every directory under this project and
    /// disables retries, so a failing phase fails on the first attempt
    /// instead of sleeping through the runner's exponential backoff.
    pub fn write_config(&self, extra: &str) -> std::path::PathBuf {
        let path = self.dir.path().join("lfsforge.toml");
        let body = format!(
            "root = {root:?}\nrecipes_dir = {recipes:?}\nhooks_dir = {hooks:?}\ndefault_retries = 0\n{extra}\n",
            root = self.root().to_str().unwrap(),
            recipes = self.recipes_dir().to_str().unwrap(),
            hooks = self.hooks_dir().to_str().unwrap(),
        );
        std::fs::write(&path, body).unwrap();
        path
    }

    /// Fabricates a completed `fetch` record plus a cached archive, so
    /// `extract`/`build` can run against `pkg` without a real download.
    /// `archive_name` is the cache-dir basename (must match the
    /// recipe's source `url`'s basename).
    pub fn seed_fetched(&self, pkg: &str, archive_name: &str, archive_bytes: &[u8]) {
        let sources_dir = self.root().join("sources").join(pkg);
        std::fs::create_dir_all(&sources_dir).unwrap();
        std::fs::write(sources_dir.join(archive_name), archive_bytes).unwrap();

        write_state_file(&self.root(), "fetch", pkg, "ok", "fetch", None);
    }

    /// Fabricates a completed `extract` record, for tests that only
    /// exercise `build`/`install` and don't care about archive contents.
    pub fn seed_extracted(&self, pkg: &str) {
        write_state_file(&self.root(), "extract", pkg, "ok", "extract", None);
    }
}

fn write_state_file(
    root: &Path,
    phase_dir: &str,
    pkg: &str,
    status: &str,
    phase: &str,
    reason: Option<&str>,
) {
    let dir = root.join("state").join(format!("{phase_dir}.d"));
    std::fs::create_dir_all(&dir).unwrap();
    let reason_line = match reason {
        Some(r) => format!("reason: {r:?}\n"),
        None => String::new(),
    };
    let yaml = format!(
        "package: {pkg:?}\nstatus: {status}\nphase: {phase:?}\n{reason_line}timestamp: \"2026-01-01T00:00:00Z\"\n"
    );
    std::fs::write(dir.join(format!("{pkg}.yml")), yaml).unwrap();
}

/// A minimal, valid gzip tarball with one regular file at `path`
/// containing `contents`. Used as a stand-in "source archive" for
/// extract tests, and read back by [`lfsforge_extract::extract`] inside
/// the binary under test.
pub fn make_tar_gz(path_in_archive: &str, contents: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let encoder = flate2::write::GzEncoder::new(&mut buf, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path_in_archive, contents)
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }
    buf
}
