//! Error kinds propagated by the core, grouped by the stage that raises
//! them. Each is a `thiserror` enum; `anyhow::Error` wraps
//! these at the CLI boundary.

use thiserror::Error;

/// Load-time errors. Any of these abort the whole run before a single
/// phase is dispatched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("recipe '{0}' not found")]
    RecipeNotFound(String),

    #[error("schema error in {path}: {reason}")]
    SchemaError { path: String, reason: String },

    #[error("dependency cycle detected: {cycle}")]
    CycleDetected { cycle: String },

    #[error("recipe '{0}' is defined more than once")]
    DuplicateRecipe(String),

    #[error("recipe '{name}' depends on unresolved package '{depends_on}'")]
    UnresolvedDependency { name: String, depends_on: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-source fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("all mirrors failed for {url}: {last_error}")]
    AllMirrorsFailed { url: String, last_error: String },

    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("unsupported checksum format: '{0}'")]
    UnsupportedChecksum(String),

    #[error("git fetch failed for {repo}: {reason}")]
    GitFetchFailed { repo: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Extraction/patch errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to extract {archive}: {reason}")]
    ExtractFailed { archive: String, reason: String },

    #[error("patch {patch} rejected at strip levels 0 and 1")]
    PatchRejected { patch: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Phase execution errors.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("configure failed: {0}")]
    ConfigureFailed(String),

    #[error("make failed: {0}")]
    MakeFailed(String),

    #[error("install failed: {0}")]
    InstallFailed(String),

    #[error("silent failure detected in {phase} log: pattern '{pattern}' matched")]
    SilentError { phase: String, pattern: String },

    #[error("phase {phase} timed out after {timeout_secs}s")]
    TimedOut { phase: String, timeout_secs: u64 },

    #[error("hook '{hook}' failed: {reason}")]
    HookFailed { hook: String, reason: String },

    #[error("execution mode {requested:?} is unavailable on this host: {reason}")]
    IsolationUnavailable { requested: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Packaging/install errors.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("packaging failed for {package}: {reason}")]
    PackageFailed { package: String, reason: String },

    #[error("install verification failed for {package} at {target_root}: {reason}")]
    InstallVerificationFailed {
        package: String,
        target_root: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
