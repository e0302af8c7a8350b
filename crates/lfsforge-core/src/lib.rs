//! Shared vocabulary for the lfsforge workspace: phase/status enums, the
//! error kinds every component propagates, and the `LogSink`/`EventRecorder`
//! traits external collaborators implement.

pub mod error;
pub mod observe;
pub mod phase;
pub mod status;

pub use error::{ExtractError, FetchError, InstallError, LoadError, PhaseError};
pub use observe::{EventRecorder, LogLevel, LogRecord, LogSink, NullEventRecorder, ResourceSample};
pub use phase::Phase;
pub use status::Status;
