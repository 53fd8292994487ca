//! Runtime settings for the foreign entry points
//!
//! The C boundary takes no configuration arguments, so the worker
//! program and the orchestration timeout come from the environment.
//!
//! | Variable                  | Meaning                                 |
//! |---------------------------|-----------------------------------------|
//! | `FIELDSPLIT_WORKER`       | worker executable (default `fieldsplit`) |
//! | `FIELDSPLIT_TIMEOUT_SECS` | orchestration timeout, seconds (float)   |
//! | `FIELDSPLIT_LOG`          | tracing filter (see `logging`)           |

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::worker::process::DEFAULT_WORKER_PROGRAM;
use crate::worker::WorkerCommand;

pub const WORKER_ENV: &str = "FIELDSPLIT_WORKER";
pub const TIMEOUT_ENV: &str = "FIELDSPLIT_TIMEOUT_SECS";
pub const LOG_ENV: &str = "FIELDSPLIT_LOG";

/// Errors raised while reading settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must not be empty")]
    Empty { var: &'static str },

    #[error("{var}={value:?} is not a positive number of seconds")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Settings resolved from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub worker_program: PathBuf,
    pub timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            worker_program: PathBuf::from(DEFAULT_WORKER_PROGRAM),
            timeout: None,
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to
    /// its value
    ///
    /// # Example
    /// ```
    /// use fieldsplit_core_rs::config::Settings;
    /// use std::time::Duration;
    ///
    /// let settings = Settings::from_lookup(|var| match var {
    ///     "FIELDSPLIT_TIMEOUT_SECS" => Some("2.5".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(settings.timeout, Some(Duration::from_millis(2500)));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        if let Some(program) = lookup(WORKER_ENV) {
            if program.trim().is_empty() {
                return Err(ConfigError::Empty { var: WORKER_ENV });
            }
            settings.worker_program = PathBuf::from(program);
        }
        if let Some(value) = lookup(TIMEOUT_ENV) {
            settings.timeout = Some(parse_timeout(TIMEOUT_ENV, &value)?);
        }
        Ok(settings)
    }

    /// Command used to spawn each worker
    pub fn worker_command(&self) -> WorkerCommand {
        WorkerCommand::for_program(&self.worker_program)
    }
}

/// Parse a positive, finite number of seconds
pub fn parse_timeout(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidTimeout {
        var,
        value: value.to_string(),
    };
    let secs: f64 = value.trim().parse().map_err(|_| invalid())?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}
