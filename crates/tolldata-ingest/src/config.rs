//! Pipeline configuration
//!
//! Every knob is read once from the environment and handed to the component
//! that needs it at construction time. Nothing consults a process-wide
//! configuration object from inside worker logic.

use std::path::PathBuf;
use std::time::Duration;
use tolldata_common::{Result, TollDataError};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Proxy endpoints for outbound requests, each independently optional.
///
/// Empty environment values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    pub http: Option<String>,
    pub https: Option<String>,
    pub no_proxy: Option<String>,
}

impl ProxyConfig {
    /// Read `HTTP_PROXY`, `HTTPS_PROXY` and `NO_PROXY`.
    pub fn from_env() -> Self {
        Self {
            http: non_empty_var("HTTP_PROXY"),
            https: non_empty_var("HTTPS_PROXY"),
            no_proxy: non_empty_var("NO_PROXY"),
        }
    }
}

/// Configuration for the reference fetch sweep.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Concurrent fetch workers
    pub max_workers: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// First backoff delay in seconds
    pub backoff_initial_secs: u64,
    /// Multiplier applied to the delay after each failed attempt
    pub backoff_multiplier: u32,
    /// Total attempts per URL before giving up
    pub max_attempts: u32,
    /// Directory the content store writes artifacts into
    pub artifact_dir: PathBuf,
    /// JSON file of request headers; when absent a single User-Agent is sent
    pub headers_file: Option<PathBuf>,
    /// User-Agent used when no headers file is configured
    pub user_agent: String,
    pub proxy: ProxyConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: 32,
            timeout_secs: 10,
            backoff_initial_secs: 15,
            backoff_multiplier: 2,
            max_attempts: 5,
            artifact_dir: PathBuf::from("./pdfs"),
            headers_file: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Read configuration from `FETCH_MAX_WORKERS`, `FETCH_TIMEOUT_SECS`,
    /// `FETCH_BACKOFF_INITIAL_SECS`, `FETCH_BACKOFF_MULTIPLIER`,
    /// `FETCH_MAX_ATTEMPTS`, `FETCH_ARTIFACT_DIR`, `FETCH_HEADERS_FILE`,
    /// `TOLLDATA_USER_AGENT` and the standard proxy variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            max_workers: parsed_var("FETCH_MAX_WORKERS", defaults.max_workers),
            timeout_secs: parsed_var("FETCH_TIMEOUT_SECS", defaults.timeout_secs),
            backoff_initial_secs: parsed_var(
                "FETCH_BACKOFF_INITIAL_SECS",
                defaults.backoff_initial_secs,
            ),
            backoff_multiplier: parsed_var("FETCH_BACKOFF_MULTIPLIER", defaults.backoff_multiplier),
            max_attempts: parsed_var("FETCH_MAX_ATTEMPTS", defaults.max_attempts),
            artifact_dir: non_empty_var("FETCH_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            headers_file: non_empty_var("FETCH_HEADERS_FILE").map(PathBuf::from),
            user_agent: non_empty_var("TOLLDATA_USER_AGENT").unwrap_or(defaults.user_agent),
            proxy: ProxyConfig::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(TollDataError::config("FETCH_MAX_WORKERS must be greater than 0"));
        }
        if self.timeout_secs == 0 {
            return Err(TollDataError::config("FETCH_TIMEOUT_SECS must be greater than 0"));
        }
        if self.max_attempts == 0 {
            return Err(TollDataError::config("FETCH_MAX_ATTEMPTS must be greater than 0"));
        }
        if self.backoff_multiplier == 0 {
            return Err(TollDataError::config(
                "FETCH_BACKOFF_MULTIPLIER must be greater than 0",
            ));
        }
        if self.user_agent.is_empty() {
            return Err(TollDataError::config("TOLLDATA_USER_AGENT cannot be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_initial(&self) -> Duration {
        Duration::from_secs(self.backoff_initial_secs)
    }
}

/// Options for the delimited toll-rate export reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter
    pub delimiter: u8,
    /// Data rows discarded after the header row. The shipped exports carry a
    /// sub-header continuation line, so the default skips one row.
    pub skip_leading_rows: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b'|',
            skip_leading_rows: 1,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
