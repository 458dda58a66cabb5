//! # Marten Logger
//!
//! Structured, leveled logging with file-backed output and automatic
//! size-based log rotation.
//!
//! ## Features
//!
//! - **Structured Records**: every log call produces an indented JSON record
//!   with timestamp, level, message and caller identity
//! - **Leveled API**: `fatal!`, `error!`, `warning!`, `info!`, `debug!` and
//!   `exception!` gated against a runtime-adjustable level
//! - **File Rotation**: a background policy compresses and replaces the
//!   active log file once it crosses a size threshold
//! - **Concurrency Safe**: writers share the rotation lock, so concurrent
//!   logging never interleaves with a file swap
//! - **Freeze-Once Configuration**: once sealed, handler and level changes
//!   are rejected for the lifetime of the logger
//!
//! ## Quick Start
//!
//! ```no_run
//! use marten_logger::{error, info, Logger};
//!
//! fn main() -> marten_logger::Result<()> {
//!     let logger = Logger::new();
//!     logger.set_handlers("/var/log/myapp", "myapp")?;
//!     logger.set_log_level("INFO")?;
//!
//!     info!(logger, "application started");
//!     error!(logger, "request failed with status {}", 502);
//!     Ok(())
//! }
//! ```
//!
//! A `Logger` is a cheap clone-by-handle value. Construct one instance at
//! process start, configure it, and pass clones to every consumer; there is
//! no implicit global.

pub mod callsite;
pub mod config;
pub mod handlers;
pub mod level;
pub mod logger;
mod macros;
pub mod record;
pub mod rotation;


pub use callsite::CallSite;
pub use config::{LoggerConfig, OutputConfig, RotationConfig};
pub use handlers::{Handlers, LoggerAttrs};
pub use level::Level;
pub use logger::Logger;
pub use record::LogRecord;

/// Result type for logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Logger-specific errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("logger configuration is frozen; no further changes are allowed")]
    Frozen,

    #[error("unknown log level {name:?}; valid levels are FATAL, ERROR, WARNING, INFO, DEBUG")]
    InvalidLevel { name: String },

    #[error("log file prefix {prefix:?} contains invalid characters; only alphanumerics are allowed")]
    InvalidPrefix { prefix: String },

    #[error("log file path {path} is not absolute")]
    RelativePath { path: std::path::PathBuf },

    #[error("no file handler is configured")]
    NoFileHandler,

    #[error("rotation policy is not running; it cannot be stopped more than once")]
    AlreadyStopped,

    #[error("exception not logged because no underlying error was supplied")]
    MissingCause,

    #[error("failed to {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {message}")]
    Config { message: String },
}
