//! Phase Runner: executes a build phase's shell command
//! under a wall-clock timeout, tees its output into the phase log, scans
//! for silent-failure patterns, and retries with backoff. The runner
//! itself is never a shell: it
//! spawns `/bin/sh -c '<recipe text>'` as a single argv element via
//! [`CommandSpec`], the same way every other phase command is spawned.

pub mod command_spec;
pub mod error;
pub mod phase_runner;
pub mod process;
pub mod unix_runner;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use phase_runner::{destdir_has_artifacts, PhaseRunner, DEFAULT_SILENT_FAILURE_PATTERNS};
pub use process::{ProcessOutput, ProcessRunner};
pub use unix_runner::UnixProcessRunner;
