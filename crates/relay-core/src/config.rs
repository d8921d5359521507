//! Application configuration
//!
//! Loaded from `RELAY_`-prefixed environment variables, after an optional
//! `.env` file:
//!
//! | Variable      | Meaning                                             |
//! |---------------|-----------------------------------------------------|
//! | `RELAY_ENV`   | `development` / `dev`, `production` / `prod`, other |
//! | `RELAY_DEBUG` | include diagnostics in error bodies                 |
//!
//! When `RELAY_DEBUG` is unset, debug is on in development only.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Prefix of every variable read by [`Config::from_env`]
pub const ENV_PREFIX: &str = "RELAY_";

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Env(#[from] envy::Error),
}

/// Environment profile
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Environment {
    /// Parse a profile name. Unknown names become [`Environment::Custom`].
    pub fn parse(name: &str) -> Self {
        match name {
            "production" | "prod" => Self::Production,
            "development" | "dev" | "" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    env: Option<String>,
    debug: Option<bool>,
}

/// Dispatch configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub environment: Environment,
    /// Add `file`, `line` and `trace` to error bodies and keep the messages
    /// of internal failures
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            debug: true,
        }
    }
}

impl Config {
    /// Production profile, debug off
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Load `.env` (if present) and read the `RELAY_` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let raw = envy::prefixed(ENV_PREFIX).from_env::<RawConfig>()?;
        Ok(Self::from_raw(raw))
    }

    /// Read the `RELAY_` variables from `vars` instead of the process
    /// environment
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw = envy::prefixed(ENV_PREFIX).from_iter::<_, RawConfig>(vars)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let environment = raw
            .env
            .as_deref()
            .map(Environment::parse)
            .unwrap_or_default();
        let debug = raw.debug.unwrap_or_else(|| environment.is_development());
        Self { environment, debug }
    }
}
