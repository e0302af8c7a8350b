//! Command-line front-end for the orchestrator core. Parses arguments, discovers
//! configuration, and dispatches to the Scheduler/Pipeline/Installer.

pub mod args;
pub mod commands;
pub mod exit_code;
mod run;

pub use args::{Cli, Commands};
pub use exit_code::ExitCode;
pub use run::run;
