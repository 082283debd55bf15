//! Logging setup for node agents.
//!
//! Output goes through `tracing-subscriber`: human readable text, one JSON
//! object per line, or the systemd journal (`journald` feature, Linux only).
//! The filter defaults to [`DEFAULT_DIRECTIVES`]; `RUST_LOG` and then
//! [`LoggerConfig::level`] override it.
mod config;
mod error;
mod logger;

pub use config::{DEFAULT_DIRECTIVES, LoggerConfig, LoggerFormat};
pub use error::LoggerError;
pub use logger::{logger_init, node_span};
