use std::io::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat};

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `info` or `info,timebox.reconcile=trace`.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl LoggerConfig {
    /// Build from raw strings as they come from the environment.
    pub fn from_parts(level: &str, format: &str) -> Result<Self, LoggerError> {
        let level = level.trim();
        Ok(Self {
            format: format.parse()?,
            level: if level.is_empty() { "info".to_string() } else { level.to_string() },
            ..Self::default()
        })
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color: std::io::stdout().is_terminal(),
        }
    }
}
