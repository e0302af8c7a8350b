//! Structured logging setup. `init_tracing` wires a compact or verbose
//! `tracing-subscriber` format depending on the CLI's `--verbose` flag;
//! `pkg_phase_span` gives every phase execution a span carrying `pkg`,
//! `phase`, and `mode` fields so concurrent workers' logs stay attributable.

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the global tracing subscriber. Idempotent-safe to call once
/// at process start; a second call returns an error that callers should
/// ignore (common in test binaries that each construct a CLI).
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("lfsforge=debug,info")
            } else {
                EnvFilter::try_new("lfsforge=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let ansi = use_color();
    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(ansi)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span for one phase execution, carrying the fields worth grepping a run
/// log by: package name, phase name, and execution mode.
pub fn pkg_phase_span(pkg: &str, phase: &str, mode: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "phase_execution",
        pkg = %pkg,
        phase = %phase,
        mode = %mode,
    )
}
