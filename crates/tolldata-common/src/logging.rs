//! Logging configuration and initialization
//!
//! One `tracing` subscriber for every tolldata binary: leveled, env-filterable,
//! text or JSON, writing to the console, a daily-rotated file, or both.
//!
//! Call [`init_logging`] exactly once at startup:
//!
//! ```no_run
//! use tolldata_common::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::from_env().with_file_prefix("tolldata-ingest");
//! init_logging(&config).unwrap();
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter, writer::MakeWriterExt},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Minimum level a message must have to be emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("invalid log level: {}", s)),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl std::str::FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            _ => Err(anyhow::anyhow!("invalid log output: {}", s)),
        }
    }
}

/// Line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("invalid log format: {}", s)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,
    /// Directory for rotated log files (used when output includes a file)
    pub log_dir: PathBuf,
    /// Log file prefix, e.g. "tolldata-ingest" -> "tolldata-ingest.2026-08-07"
    pub file_prefix: String,
    /// Extra filter directives, e.g. "sqlx=warn,reqwest=info"
    pub filter_directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("./logs"),
            file_prefix: "tolldata".to_string(),
            filter_directives: None,
        }
    }
}

impl LogConfig {
    /// Read configuration from `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`,
    /// `LOG_DIR`, `LOG_FILE_PREFIX` and `LOG_FILTER`. Unset or unparseable
    /// variables fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(level) = std::env::var("LOG_LEVEL").ok().and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(output) = std::env::var("LOG_OUTPUT").ok().and_then(|v| v.parse().ok()) {
            config.output = output;
        }
        if let Some(format) = std::env::var("LOG_FORMAT").ok().and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("LOG_FILE_PREFIX") {
            config.file_prefix = prefix;
        }
        if let Ok(filter) = std::env::var("LOG_FILTER") {
            config.filter_directives = Some(filter);
        }

        config
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.filter_directives = Some(directives.into());
        self
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());

    if let Some(directives) = &config.filter_directives {
        for directive in directives.split(',') {
            filter = filter.add_directive(
                directive
                    .trim()
                    .parse()
                    .with_context(|| format!("bad log filter directive: {}", directive))?,
            );
        }
    }

    let writer = match config.output {
        LogOutput::Console => BoxMakeWriter::new(std::io::stdout),
        LogOutput::File => BoxMakeWriter::new(file_writer(config)?),
        LogOutput::Both => BoxMakeWriter::new(std::io::stdout.and(file_writer(config)?)),
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(config.output == LogOutput::Console);

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?,
    }

    Ok(())
}

fn file_writer(config: &LogConfig) -> Result<tracing_appender::non_blocking::NonBlocking> {
    std::fs::create_dir_all(&config.log_dir).context("failed to create log directory")?;

    let appender = tracing_appender::rolling::daily(&config.log_dir, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    // The guard flushes on drop; it has to live as long as the process does.
    std::mem::forget(guard);

    Ok(non_blocking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("Error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_output_from_str() {
        assert_eq!("stdout".parse::<LogOutput>().unwrap(), LogOutput::Console);
        assert_eq!("file".parse::<LogOutput>().unwrap(), LogOutput::File);
        assert_eq!("both".parse::<LogOutput>().unwrap(), LogOutput::Both);
        assert!("syslog".parse::<LogOutput>().is_err());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("logfmt".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_config_chaining() {
        let config = LogConfig::default()
            .with_level(LogLevel::Debug)
            .with_file_prefix("test")
            .with_filter_directives("sqlx=warn");

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.file_prefix, "test");
        assert_eq!(config.filter_directives.as_deref(), Some("sqlx=warn"));
    }
}
