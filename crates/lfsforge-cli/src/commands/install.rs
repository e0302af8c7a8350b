//! `lfsforge install`.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use lfsforge_core::Status;
use lfsforge_install::{InstallOutcome, Installer};

use super::common::{build_context, load_store, resolve_targets};
use crate::exit_code::ExitCode;

#[allow(clippy::too_many_arguments)]
pub fn run(
    cfg: lfsforge_config::Config,
    continue_: bool,
    verify_only: bool,
    dry_run: bool,
    root: Option<Utf8PathBuf>,
    pkg: Vec<String>,
) -> Result<ExitCode> {
    let store = load_store(&cfg)?;
    let targets = resolve_targets(&store, &pkg);
    let target_root = root
        .or_else(|| cfg.chroot_path.clone())
        .context("no target root given: pass --root or set chroot_path in config")?;
    let ctx = build_context(cfg)?;
    let installer = Installer::new(ctx.layout.clone(), (*ctx.locks).clone());

    let mut any_failed = false;
    for name in &targets {
        let Ok(state) = ctx.build_state.read(name) else {
            println!("{name}: failed (could not read build state)");
            any_failed = true;
            continue;
        };
        let Some(state) = state.filter(|s| s.status == Status::Ok) else {
            println!("{name}: skipped (not built)");
            continue;
        };
        let Some(artifact) = state.package_artifact else {
            println!("{name}: skipped (no packaged artifact recorded)");
            continue;
        };

        if verify_only {
            match installer.verify_only(&target_root) {
                Ok(true) => println!("{name}: ok (verified)"),
                Ok(false) => {
                    println!("{name}: failed (verification found no installed files)");
                    any_failed = true;
                }
                Err(e) => {
                    println!("{name}: failed ({e})");
                    any_failed = true;
                }
            }
            continue;
        }

        if dry_run {
            println!("{name}: would install {} into {target_root}", artifact.path);
            continue;
        }

        let artifact_path = Utf8PathBuf::from(artifact.path);
        match installer.install_with(name, &artifact_path, &target_root, !continue_) {
            Ok(InstallOutcome::Installed) => println!("{name}: ok"),
            Ok(InstallOutcome::AlreadyInstalled) => println!("{name}: skipped (already installed)"),
            Ok(InstallOutcome::Busy) => println!("{name}: skipped (locked)"),
            Err(e) => {
                println!("{name}: failed ({e})");
                any_failed = true;
            }
        }
    }

    Ok(if any_failed {
        ExitCode::PackageFailed
    } else {
        ExitCode::Success
    })
}
