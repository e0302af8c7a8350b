//! Low-level process-spawn errors for the runner module. Domain-level
//! failures (a phase's command exiting non-zero, a silent-failure
//! pattern match, a timeout) are reported as `lfsforge_core::PhaseError`
//! instead; this type only covers the spawn itself going wrong.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("runner configuration invalid: {reason}")]
    ConfigurationInvalid { reason: String },

    #[error("execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
