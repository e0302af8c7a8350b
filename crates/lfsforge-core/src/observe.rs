//! `LogSink` and `EventRecorder`: the two external-collaborator interfaces
//! for structured logging and periodic resource sampling. Treated as
//! external collaborators whose interface the core consumes; this crate
//! only defines the contract plus a no-op/tracing-backed default so the
//! engine has something to depend on without forcing a concrete telemetry
//! stack on every embedder.

use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::Mutex;

/// Severity of a structured log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A structured record: `{level, timestamp, pkg?, phase?, message}`.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub pkg: Option<String>,
    pub phase: Option<String>,
    pub message: String,
}

/// Receives structured records and raw byte streams. Implementations must
/// be safe for concurrent writers — the Scheduler's worker pool writes to
/// the same sink from multiple threads.
pub trait LogSink: Send + Sync {
    fn record(&self, rec: &LogRecord);

    /// A writer for the raw, interleaved stdout/stderr of one phase
    /// execution. Per-stream ordering must be preserved; cross-stream
    /// interleaving is not guaranteed.
    fn stream_writer(&self, pkg: &str, phase: &str) -> Box<dyn Write + Send>;
}

/// Accepts run-level messages and periodic resource samples.
/// Implementations may no-op; the core never depends on delivery
/// succeeding or even being attempted.
pub trait EventRecorder: Send + Sync {
    fn event(&self, run_id: &str, job_id: Option<&str>, level: LogLevel, message: &str);

    fn sample(&self, sample: &ResourceSample);
}

/// A single resource-usage sample.
#[derive(Debug, Clone)]
pub struct ResourceSample {
    pub job_id: String,
    pub cpu_user_pct: f32,
    pub cpu_system_pct: f32,
    pub mem_used_bytes: u64,
    pub disk_used_bytes: u64,
    pub load_1_5_15: (f32, f32, f32),
    pub timestamp: DateTime<Utc>,
}

/// An `EventRecorder` that drops everything. The default for runs that
/// don't configure a telemetry sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventRecorder;

impl EventRecorder for NullEventRecorder {
    fn event(&self, _run_id: &str, _job_id: Option<&str>, _level: LogLevel, _message: &str) {}
    fn sample(&self, _sample: &ResourceSample) {}
}

/// A `LogSink` that forwards structured records to `tracing` and raw
/// streams to a per-(pkg, phase) file handle at `<root>/logs/<pkg>/<phase>.log`.
pub struct TracingLogSink {
    logs_root: camino::Utf8PathBuf,
}

impl TracingLogSink {
    pub fn new(logs_root: camino::Utf8PathBuf) -> Self {
        Self { logs_root }
    }
}

impl LogSink for TracingLogSink {
    fn record(&self, rec: &LogRecord) {
        let pkg = rec.pkg.as_deref().unwrap_or("-");
        let phase = rec.phase.as_deref().unwrap_or("-");
        match rec.level {
            LogLevel::Debug => tracing::debug!(pkg, phase, "{}", rec.message),
            LogLevel::Info => tracing::info!(pkg, phase, "{}", rec.message),
            LogLevel::Warn => tracing::warn!(pkg, phase, "{}", rec.message),
            LogLevel::Error => tracing::error!(pkg, phase, "{}", rec.message),
        }
    }

    fn stream_writer(&self, pkg: &str, phase: &str) -> Box<dyn Write + Send> {
        let dir = self.logs_root.join(pkg);
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join(format!("{phase}.log"));
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(f) => Box::new(Mutex::new(f)),
            // Falling back to a discard sink keeps phase execution itself
            // from failing over a logging I/O error.
            Err(_) => Box::new(std::io::sink()),
        }
    }
}
