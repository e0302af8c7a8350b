//! Shared result types for one pipeline step.

use lfsforge_core::{ExtractError, FetchError, InstallError, PhaseError};
use thiserror::Error;

/// What happened when a [`crate::Pipeline`] method ran to completion
/// without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Every edge for this step ran and the terminal state was recorded
    /// `ok`.
    Done,
    /// The State Store already recorded `ok` for this phase group; the
    /// step was not re-attempted.
    AlreadySatisfied,
    /// The `(phase, pkg)` lock is held by another runner; reported as
    /// skipped rather than failed.
    Locked,
    /// A boundary case reported as `skipped` rather than attempted at all,
    /// e.g. a recipe with zero sources (reason `no-sources-found`).
    Skipped(String),
}

/// Why a step failed, carrying enough detail for the State Store's
/// `reason` field.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("prerequisite not satisfied: {0}")]
    PrerequisiteUnmet(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
