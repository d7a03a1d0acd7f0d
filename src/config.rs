use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::kernel::tracker::Thresholds;

pub const DEFAULT_LISTENERS_URL: &str = "https://streaming.lahmacun.hu/api/station/1/listeners";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_EXPORT_PREFIX: &str = "lahma";

/// Upper bounds keep every derived `Duration` and timer deadline representable.
pub const MAX_WINDOW_HOURS: f64 = 366.0 * 24.0;
pub const MAX_THRESHOLD_MINUTES: u64 = 366 * 24 * 60;
pub const MAX_INTERVAL_SECS: u64 = 24 * 3600;

pub const USAGE: &str = "usage: airtime <window_hours>

  window_hours   export and reset every N hours (e.g. 24, or 0.5; at most 8784)

environment:
  API_KEY                 station API key (required)
  OUTPUT_PATH             export directory (default: current directory)
  LISTENERS_URL           listeners endpoint
  POLL_INTERVAL_SECS      snapshot period (default: 30)
  FETCH_TIMEOUT_SECS      listener request timeout (default: 10)
  LONG_LISTENER_MINUTES   long listener threshold (default: 5)
  SHORT_LISTENER_MINUTES  short listener threshold (default: 1)
  EXPORT_PREFIX           export filename prefix (default: lahma)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing window length argument")]
    MissingWindow,
    #[error("window length must be a positive number of hours, got {0:?}")]
    InvalidWindow(String),
    #[error("API_KEY is not set")]
    MissingCredential,
    #[error("{name} must be a positive integer no larger than {max}, got {value:?}")]
    InvalidNumber { name: &'static str, value: String, max: u64 },
}

#[derive(Clone)]
pub struct Config {
    pub window_length: Duration,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub thresholds: Thresholds,
    pub api_key: String,
    pub listeners_url: String,
    pub output_dir: PathBuf,
    pub export_prefix: String,
}

// Hand-written so the credential never reaches the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("window_length", &self.window_length)
            .field("poll_interval", &self.poll_interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("thresholds", &self.thresholds)
            .field("api_key", &"<redacted>")
            .field("listeners_url", &self.listeners_url)
            .field("output_dir", &self.output_dir)
            .field("export_prefix", &self.export_prefix)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::from_sources(&args, |name| std::env::var(name).ok())
    }

    /// `args` excludes the program name.
    pub fn from_sources<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let window_length = parse_window(args.first().map(String::as_str))?;

        let api_key = env("API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingCredential)?;

        let minutes = |name: &'static str, default: u64| -> Result<Duration, ConfigError> {
            let value = positive(name, env(name), default, MAX_THRESHOLD_MINUTES)?;
            Ok(Duration::from_secs(value * 60))
        };
        let thresholds = Thresholds {
            long: minutes("LONG_LISTENER_MINUTES", 5)?,
            short: minutes("SHORT_LISTENER_MINUTES", 1)?,
        };

        Ok(Self {
            window_length,
            poll_interval: Duration::from_secs(positive(
                "POLL_INTERVAL_SECS",
                env("POLL_INTERVAL_SECS"),
                DEFAULT_POLL_INTERVAL.as_secs(),
                MAX_INTERVAL_SECS,
            )?),
            fetch_timeout: Duration::from_secs(positive(
                "FETCH_TIMEOUT_SECS",
                env("FETCH_TIMEOUT_SECS"),
                DEFAULT_FETCH_TIMEOUT.as_secs(),
                MAX_INTERVAL_SECS,
            )?),
            thresholds,
            api_key,
            listeners_url: non_empty(env("LISTENERS_URL")).unwrap_or_else(|| DEFAULT_LISTENERS_URL.to_string()),
            output_dir: non_empty(env("OUTPUT_PATH")).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            export_prefix: non_empty(env("EXPORT_PREFIX")).unwrap_or_else(|| DEFAULT_EXPORT_PREFIX.to_string()),
        })
    }
}

fn parse_window(arg: Option<&str>) -> Result<Duration, ConfigError> {
    let raw = arg.ok_or(ConfigError::MissingWindow)?;
    let hours: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidWindow(raw.to_string()))?;
    if !hours.is_finite() || hours <= 0.0 || hours > MAX_WINDOW_HOURS {
        return Err(ConfigError::InvalidWindow(raw.to_string()));
    }
    match Duration::try_from_secs_f64(hours * 3600.0) {
        Ok(window) if !window.is_zero() => Ok(window),
        _ => Err(ConfigError::InvalidWindow(raw.to_string())),
    }
}

fn positive(name: &'static str, value: Option<String>, default: u64, max: u64) -> Result<u64, ConfigError> {
    match non_empty(value) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if n > 0 && n <= max => Ok(n),
            _ => Err(ConfigError::InvalidNumber { name, value: raw, max }),
        },
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
