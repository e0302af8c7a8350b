use std::process::{Command, ExitStatus, Stdio};

use camino::Utf8Path;
use lfsforge_core::ExtractError;

/// Apply `patches` to `workspace` in order. Each patch is dry-run at `-p1` first, falling back to
/// `-p0`, and applied for real at whichever strip level succeeds.
pub fn apply_patches(workspace: &Utf8Path, patches: &[camino::Utf8PathBuf]) -> Result<(), ExtractError> {
    for patch in patches {
        apply_one(workspace, patch)?;
    }
    Ok(())
}

fn apply_one(workspace: &Utf8Path, patch: &Utf8Path) -> Result<(), ExtractError> {
    for strip in [1, 0] {
        if dry_run(workspace, patch, strip)? {
            return run_patch(workspace, patch, strip);
        }
    }
    Err(ExtractError::PatchRejected {
        patch: patch.to_string(),
    })
}

fn dry_run(workspace: &Utf8Path, patch: &Utf8Path, strip: u32) -> Result<bool, ExtractError> {
    let status = patch_command(workspace, patch, strip, true)?;
    Ok(status.success())
}

fn run_patch(workspace: &Utf8Path, patch: &Utf8Path, strip: u32) -> Result<(), ExtractError> {
    let status = patch_command(workspace, patch, strip, false)?;
    if status.success() {
        Ok(())
    } else {
        Err(ExtractError::PatchRejected {
            patch: patch.to_string(),
        })
    }
}

fn patch_command(
    workspace: &Utf8Path,
    patch: &Utf8Path,
    strip: u32,
    dry_run: bool,
) -> Result<ExitStatus, ExtractError> {
    let mut cmd = Command::new("patch");
    cmd.current_dir(workspace.as_std_path())
        .arg(format!("-p{strip}"))
        .arg("--forward")
        .arg("-i")
        .arg(patch.as_std_path())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if dry_run {
        cmd.arg("--dry-run");
    }
    cmd.status().map_err(|e| ExtractError::ExtractFailed {
        archive: patch.to_string(),
        reason: e.to_string(),
    })
}
