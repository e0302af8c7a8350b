//! Hook resolution and invocation.
//!
//! A hook value takes one of three forms, tried in order: an inline
//! shell command, a path relative to the package workspace, or a path
//! under the configured hooks directory. Hooks other than the primary
//! phases are non-fatal by default: a non-zero exit is logged and
//! execution continues. A recipe can escalate a hook to a hard failure
//! by exiting with [`ESCALATE_EXIT_CODE`].

use std::process::Command;

use camino::Utf8Path;
use lfsforge_core::PhaseError;

/// Exit code a hook script uses to escalate past the default
/// warn-and-continue behavior into a phase-terminal failure.
pub const ESCALATE_EXIT_CODE: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
enum HookTarget {
    Inline(String),
    Script(camino::Utf8PathBuf),
}

/// Run the hook named `hook_name` if `value` is present. `workspace` is
/// the cwd hooks execute in (for `pre_extract`, callers pass the
/// sources cache directory instead per the documented exception).
pub fn run_hook(
    hook_name: &str,
    value: Option<&str>,
    workspace: &Utf8Path,
    hooks_dir: &Utf8Path,
    env: &[(String, String)],
    log: &Utf8Path,
) -> Result<(), PhaseError> {
    let Some(value) = value else {
        return Ok(());
    };

    let target = resolve(value, workspace, hooks_dir);
    let mut cmd = match &target {
        HookTarget::Inline(script) => {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(script);
            cmd
        }
        HookTarget::Script(path) => Command::new(path.as_std_path()),
    };
    cmd.current_dir(workspace.as_std_path());
    for (key, val) in env {
        cmd.env(key, val);
    }

    if let Some(parent) = log.parent() {
        std::fs::create_dir_all(parent.as_std_path())?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log.as_std_path())?;
    cmd.stdout(log_file.try_clone()?);
    cmd.stderr(log_file);

    let status = cmd.status()?;
    match status.code() {
        Some(0) => Ok(()),
        Some(ESCALATE_EXIT_CODE) => Err(PhaseError::HookFailed {
            hook: hook_name.to_string(),
            reason: format!("exited {ESCALATE_EXIT_CODE} (escalated)"),
        }),
        Some(code) => {
            tracing::warn!(hook = hook_name, code, "hook failed; continuing");
            Ok(())
        }
        None => {
            tracing::warn!(hook = hook_name, "hook terminated by signal; continuing");
            Ok(())
        }
    }
}

/// Three-form resolution order for a hook field value: inline command,
/// workspace-relative path, hooks-dir path.
fn resolve(value: &str, workspace: &Utf8Path, hooks_dir: &Utf8Path) -> HookTarget {
    if looks_like_inline_command(value) {
        return HookTarget::Inline(value.to_string());
    }

    let workspace_path = workspace.join(value);
    if workspace_path.as_std_path().is_file() {
        return HookTarget::Script(workspace_path);
    }

    HookTarget::Script(hooks_dir.join(value))
}

fn looks_like_inline_command(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_whitespace() || "|&;<>$`".contains(c))
}
