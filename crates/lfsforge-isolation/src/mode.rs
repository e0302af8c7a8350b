//! Execution-mode selection: picks one of
//! `{direct, fakeroot, chroot}`, folding in the global config override and
//! falling back `fakeroot → direct` when the wrapper isn't installed.

use lfsforge_config::ExecMode;

/// The mode actually used to run a phase, after availability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedMode {
    Direct,
    Fakeroot,
    Chroot,
}

impl ResolvedMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedMode::Direct => "direct",
            ResolvedMode::Fakeroot => "fakeroot",
            ResolvedMode::Chroot => "chroot",
        }
    }
}

/// Checks whether a binary named `fakeroot` is reachable. Exposed as a
/// free function so tests can substitute a different probe.
pub trait ToolProbe: Send + Sync {
    fn is_available(&self, program: &str) -> bool;
}

/// Probes `PATH` via `which`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathToolProbe;

impl ToolProbe for PathToolProbe {
    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// `global_override` of `Auto` defers entirely to `recipe_mode`; any other
/// value wins outright.
pub fn resolve_mode(
    recipe_mode: ExecMode,
    global_override: ExecMode,
    probe: &dyn ToolProbe,
) -> ResolvedMode {
    let requested = match global_override {
        ExecMode::Auto => recipe_mode,
        other => other,
    };
    match requested {
        ExecMode::Auto | ExecMode::Direct => ResolvedMode::Direct,
        ExecMode::Fakeroot => {
            if probe.is_available("fakeroot") {
                ResolvedMode::Fakeroot
            } else {
                tracing::warn!(
                    "fakeroot requested but not found on PATH; falling back to direct execution"
                );
                ResolvedMode::Direct
            }
        }
        ExecMode::Chroot => ResolvedMode::Chroot,
    }
}
