use std::io::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat};

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `info` or `workline_core=debug,info`.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl LoggerConfig {
    /// Builds a config from textual format and level, as given on a command line.
    pub fn parse(format: &str, level: impl Into<String>) -> Result<Self, LoggerError> {
        Ok(Self {
            format: format.parse()?,
            level: level.into(),
            ..Self::default()
        })
    }

    pub fn with_targets(mut self, on: bool) -> Self {
        self.with_targets = on;
        self
    }

    pub fn with_color(mut self, on: bool) -> Self {
        self.use_color = on;
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        // Log lines go to stderr; color only when it is a terminal.
        let use_color = std::io::stderr().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
        }
    }
}
