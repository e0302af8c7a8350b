use thiserror::Error;

/// Errors raised by mode selection and the chroot virtual-filesystem
/// lifecycle. Callers that need a [`lfsforge_core::PhaseError`]
/// wrap these into `PhaseError::IsolationUnavailable`.
#[derive(Debug, Error)]
pub enum IsolationError {
    #[error("execution mode '{requested}' is unavailable: {reason}")]
    ModeUnavailable { requested: String, reason: String },

    #[error("failed to mount {target}: {reason}")]
    MountFailed { target: String, reason: String },

    #[error("failed to unmount {target}: {reason}")]
    UnmountFailed { target: String, reason: String },

    #[error("chroot session in state '{state}' cannot {action}")]
    InvalidTransition { state: String, action: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
