//! Wraps a phase's shell invocation for the resolved execution mode
//!. `direct` passes the command through unchanged;
//! `fakeroot` prepends the wrapper binary; `chroot` writes a script inside
//! the target root and invokes it via `chroot` under a clean environment
//! that preserves only `HOME`, `TERM`, `PS1`, `PATH`.

use camino::Utf8Path;
use lfsforge_runner::CommandSpec;

use crate::error::IsolationError;
use crate::mode::ResolvedMode;

/// Environment variables preserved across the clean-environment boundary
/// when entering a chroot.
const CHROOT_PRESERVED_VARS: &[&str] = &["HOME", "TERM", "PS1", "PATH"];

/// Rewrites `cmd` (already a fully-formed `sh -c '<script>'` invocation)
/// according to `mode`. For `Chroot`, `chroot_root` must be the target
/// root and `script` the same recipe text already embedded in `cmd`, since
/// the wrapper file has to be (re)written inside the target filesystem
/// rather than referenced from the host path.
pub fn wrap(
    mode: ResolvedMode,
    cmd: CommandSpec,
    script: &str,
    chroot_root: Option<&Utf8Path>,
) -> Result<CommandSpec, IsolationError> {
    match mode {
        ResolvedMode::Direct => Ok(cmd),
        ResolvedMode::Fakeroot => Ok(wrap_fakeroot(cmd)),
        ResolvedMode::Chroot => {
            let root = chroot_root.ok_or_else(|| IsolationError::ModeUnavailable {
                requested: "chroot".to_string(),
                reason: "no target root configured".to_string(),
            })?;
            wrap_chroot(root, script, cmd.cwd.as_deref())
        }
    }
}

fn wrap_fakeroot(cmd: CommandSpec) -> CommandSpec {
    let mut wrapped = CommandSpec::new("fakeroot").arg(cmd.program);
    wrapped = wrapped.args(cmd.args);
    if let Some(cwd) = cmd.cwd {
        wrapped = wrapped.cwd(cwd);
    }
    if let Some(env) = cmd.env {
        wrapped = wrapped.envs(env);
    }
    wrapped
}

/// Writes `script` to a throwaway file under `<root>/tmp/` and returns a
/// `chroot <root> /bin/sh /tmp/<name>` command running under a clean
/// environment. `cwd_inside` (host path under the workspace, e.g.
/// `<root>/build/<pkg>/build`) is translated to the matching path inside
/// the chroot by stripping the `root` prefix, since the command executes
/// with `root` as `/`.
fn wrap_chroot(
    root: &Utf8Path,
    script: &str,
    cwd_inside: Option<&std::path::Path>,
) -> Result<CommandSpec, IsolationError> {
    let tmp_dir = root.join("tmp");
    std::fs::create_dir_all(&tmp_dir)?;

    let cwd_line = cwd_inside
        .and_then(|p| camino::Utf8Path::from_path(p))
        .and_then(|p| p.strip_prefix(root).ok())
        .map(|rel| format!("cd /{rel}\n"))
        .unwrap_or_default();

    let mut file = tempfile::Builder::new()
        .prefix("lfsforge-run-")
        .suffix(".sh")
        .tempfile_in(tmp_dir.as_std_path())?;
    use std::io::Write;
    write!(file, "#!/bin/sh\n{cwd_line}{script}\n")?;
    let (_, path) = file.keep().map_err(|e| IsolationError::Io(e.error))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms)?;
    }

    let inside_path = camino::Utf8Path::from_path(&path)
        .and_then(|p| p.strip_prefix(root).ok())
        .map(|rel| format!("/{rel}"))
        .unwrap_or_else(|| path.display().to_string());

    let mut wrapped = CommandSpec::new("chroot")
        .arg(root.as_str())
        .arg("/bin/sh")
        .arg(inside_path)
        .env_clear();
    for var in CHROOT_PRESERVED_VARS {
        if let Ok(value) = std::env::var(var) {
            wrapped = wrapped.env(*var, value);
        }
    }
    Ok(wrapped)
}
