use tracing_subscriber::{filter::ParseError, util::TryInitError};

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}, expected text, json or journald")]
    UnknownFormat(String),

    #[error("invalid log directives {directives:?}")]
    Directives {
        directives: String,
        #[source]
        source: ParseError,
    },

    #[error("journald output needs linux and the `journald` feature")]
    JournaldUnsupported,

    #[error("journald socket unavailable")]
    Journald(#[source] std::io::Error),

    /// Either the global dispatcher or the `log` bridge was set before.
    #[error("a global logger is already installed")]
    AlreadyInstalled(#[from] TryInitError),
}
