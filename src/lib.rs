//! lfsforge - a Linux-From-Scratch/BLFS build orchestrator core.
//!
//! This crate is a thin binary shell: the pipeline engine, scheduler,
//! recipe store, state store, fetcher, extractor, phase runner,
//! isolation manager, and installer all live in the `lfsforge-*` crates
//! under `crates/`. This crate only wires process entry to
//! [`lfsforge_cli::run`].

pub use lfsforge_cli::{run, Cli, Commands, ExitCode};
