//! Flat configuration mapping consumed at startup: roots,
//! concurrency, default timeout, default retry count, strip-binaries flag,
//! package archive type, chroot path. Loaded with precedence
//! CLI flags > config file > defaults, discovered by walking upward from
//! the current directory for `.lfsforge/config.toml`.

mod builder;
mod discovery;
mod model;

pub use builder::ConfigBuilder;
pub use discovery::CliOverrides;
pub use model::{ArchiveType, Config, ExecMode};
