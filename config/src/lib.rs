//! Strata configuration.
//!
//! `~/.strata/config.toml` (or the file named by `STRATA_CONFIG`) is parsed
//! into [`StrataConfig`], whose sections are all optional. [`Settings`] is the
//! resolved view the host runs with: file values, then `STRATA_*` environment
//! overrides, then built-in defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;
use strata_pool::{SemaphoreError, SemaphoreSize};
use thiserror::Error;
use toml::de::Error as TomlError;

pub const DEFAULT_ROOT_KEY: &str = "app";
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(8);
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Env var naming an alternative config file.
pub const CONFIG_ENV: &str = "STRATA_CONFIG";
pub const SCHEDULER_ENV: &str = "STRATA_SCHEDULER";
pub const CONCURRENCY_ENV: &str = "STRATA_CONCURRENCY";

#[derive(Debug, Default, Deserialize)]
pub struct StrataConfig {
    pub state: Option<StateConfig>,
    pub fan_out: Option<FanOutConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: TomlError,
    },
    #[error("invalid fan-out concurrency: {0}")]
    Concurrency(#[from] SemaphoreError),
    #[error("unknown scheduler {value:?} (expected \"frame\" or \"immediate\")")]
    Scheduler { value: String },
}

impl ConfigError {
    /// The offending file, for read and parse failures.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Concurrency(_) | ConfigError::Scheduler { .. } => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StateConfig {
    /// Top-level key of the state tree. Default: `"app"`.
    pub root_key: Option<String>,
    #[serde(default)]
    pub scheduler: TickMode,
    /// Render cadence driving the frame clock. Default: 8.
    pub frame_interval_ms: Option<u64>,
}

/// When change notifications fire.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TickMode {
    /// Once per frame, however many writes the frame saw.
    #[default]
    Frame,
    /// Synchronously after every write.
    Immediate,
}

impl TickMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::Immediate => "immediate",
        }
    }
}

impl FromStr for TickMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frame" => Ok(Self::Frame),
            "immediate" => Ok(Self::Immediate),
            _ => Err(ConfigError::Scheduler {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FanOutConfig {
    /// Maximum simultaneous fetches. Default: 4.
    pub concurrency: Option<SizeSetting>,
}

/// A semaphore size as written in TOML: `4`, `4.0`, or `"4"`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SizeSetting {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl SizeSetting {
    pub fn resolve(&self) -> Result<SemaphoreSize, SemaphoreError> {
        match self {
            SizeSetting::Integer(size) => SemaphoreSize::try_from(*size),
            SizeSetting::Float(size) => SemaphoreSize::try_from(*size),
            SizeSetting::Text(size) => size.parse(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

impl StrataConfig {
    /// Loads the config file. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

/// `STRATA_CONFIG` if set, else `~/.strata/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|path| !path.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".strata").join("config.toml"))
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub root_key: String,
    pub tick_mode: TickMode,
    pub frame_interval: Duration,
    pub concurrency: SemaphoreSize,
    pub log_filter: Option<String>,
}

impl Settings {
    /// Resolves `config` against the process environment.
    pub fn resolve(config: Option<&StrataConfig>) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |key| env::var(key).ok())
    }

    /// Resolves `config`, reading overrides through `lookup`.
    pub fn resolve_with(
        config: Option<&StrataConfig>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let state = config.and_then(|c| c.state.as_ref());
        let fan_out = config.and_then(|c| c.fan_out.as_ref());
        let logging = config.and_then(|c| c.logging.as_ref());
        let override_for = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let tick_mode = match override_for(SCHEDULER_ENV) {
            Some(value) => value.parse()?,
            None => state.map(|s| s.scheduler).unwrap_or_default(),
        };

        let concurrency = match override_for(CONCURRENCY_ENV) {
            Some(value) => value.parse::<SemaphoreSize>()?,
            None => match fan_out.and_then(|f| f.concurrency.as_ref()) {
                Some(setting) => setting.resolve()?,
                None => SemaphoreSize::try_from(DEFAULT_CONCURRENCY)?,
            },
        };

        Ok(Self {
            root_key: state
                .and_then(|s| s.root_key.clone())
                .filter(|key| !key.is_empty())
                .unwrap_or_else(|| DEFAULT_ROOT_KEY.to_string()),
            tick_mode,
            frame_interval: state
                .and_then(|s| s.frame_interval_ms)
                .filter(|ms| *ms > 0)
                .map_or(DEFAULT_FRAME_INTERVAL, Duration::from_millis),
            concurrency,
            log_filter: logging.and_then(|l| l.filter.clone()),
        })
    }
}
