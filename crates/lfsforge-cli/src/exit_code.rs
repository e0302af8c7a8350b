//! Process exit codes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    /// One or more target packages ended `failed` (or were `blocked` by
    /// a failed dependency).
    PackageFailed,
    /// Load-time failure: schema error, unresolved dependency, or a
    /// dependency cycle. No phase ran.
    LoadError,
    /// Invalid CLI arguments or configuration.
    UsageError,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::PackageFailed => 1,
            ExitCode::LoadError => 2,
            ExitCode::UsageError => 64,
        }
    }
}
