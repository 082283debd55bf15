use std::{io::IsTerminal, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::LoggerError;

/// Agent crates at `info`, everything else at `warn`.
pub const DEFAULT_DIRECTIVES: &str = "warn,dxf_core=info,dxf_prometheus=info,dxf_agentd=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerFormat {
    #[default]
    Text,
    Json,
    Journald,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "journald" => Ok(Self::Journald),
            _ => Err(LoggerError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directives, e.g. `dxf_core=debug,info`. Wins over `RUST_LOG`.
    pub level: Option<String>,
    /// Print the module path of every event.
    pub with_targets: bool,
    /// ANSI colors for text output; `None` colors only a terminal.
    pub color: Option<bool>,
}

impl LoggerConfig {
    /// Filter directives to install: `level`, then `env`, then the defaults.
    pub(crate) fn directives(&self, env: Option<String>) -> String {
        self.level
            .clone()
            .or_else(|| env.filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string())
    }

    pub(crate) fn ansi(&self) -> bool {
        self.color
            .unwrap_or_else(|| std::io::stdout().is_terminal())
    }
}
