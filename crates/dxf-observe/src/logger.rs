use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::{Span, info_span};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::time::OffsetTime, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{
    config::{LoggerConfig, LoggerFormat},
    error::LoggerError,
};

type Output = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInstalled`] on a second call.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = filter(cfg, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;
    tracing_subscriber::registry()
        .with(output(cfg)?)
        .with(filter)
        .try_init()?;
    Ok(())
}

/// Root span of everything the agent logs for node `exec_id`.
pub fn node_span(exec_id: &str) -> Span {
    info_span!("node", exec_id)
}

fn filter(cfg: &LoggerConfig, env: Option<String>) -> Result<EnvFilter, LoggerError> {
    let directives = cfg.directives(env);
    EnvFilter::builder()
        .parse(&directives)
        .map_err(|source| LoggerError::Directives { directives, source })
}

fn output(cfg: &LoggerConfig) -> Result<Output, LoggerError> {
    let layer = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_ansi(cfg.ansi())
            .with_target(cfg.with_targets)
            .with_timer(local_rfc3339())
            .boxed(),
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(cfg.with_targets)
            .with_timer(local_rfc3339())
            .boxed(),
        LoggerFormat::Journald => journald()?,
    };
    Ok(layer)
}

fn local_rfc3339() -> OffsetTime<Rfc3339> {
    // The local offset cannot be read safely once other threads run.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald() -> Result<Output, LoggerError> {
    let layer = tracing_journald::layer().map_err(LoggerError::Journald)?;
    Ok(layer.boxed())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald() -> Result<Output, LoggerError> {
    Err(LoggerError::JournaldUnsupported)
}
