//! Error types for backend-core.
//!
//! Two classes exist: configuration errors, which are fatal at startup, and
//! database errors, which come straight from sqlx and are never translated.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single environment variable was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// The variable is required and was unset or empty.
    Missing,

    /// The variable was set but could not be coerced.
    Invalid {
        /// Offending value, `None` when the variable holds a secret.
        value: Option<String>,
        reason: String,
    },
}

/// A rejected environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Environment variable name, e.g. `POSTGRES_PORT`.
    pub var: &'static str,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn missing(var: &'static str) -> Self {
        Self {
            var,
            kind: FieldErrorKind::Missing,
        }
    }

    pub fn invalid(var: &'static str, value: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            var,
            kind: FieldErrorKind::Invalid {
                value: value.map(str::to_string),
                reason: reason.into(),
            },
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.kind, FieldErrorKind::Missing)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FieldErrorKind::Missing => write!(f, "{} is required but not set", self.var),
            FieldErrorKind::Invalid {
                value: Some(value),
                reason,
            } => write!(f, "{}={:?} is invalid: {}", self.var, value, reason),
            FieldErrorKind::Invalid {
                value: None,
                reason,
            } => write!(f, "{} is invalid: {}", self.var, reason),
        }
    }
}

/// Condition noticed while resolving settings that does not stop startup.
///
/// Resolution usually runs before logging is configured, so warnings are
/// collected on the settings and logged once a subscriber is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `LAUNCH_MODE` held an unknown value; production settings were used.
    UnrecognizedLaunchMode(String),

    /// No `SECRET_KEY`; a key was generated for this process only.
    GeneratedSecretKey,

    /// `DEBUG` was requested under the production launch mode.
    DebugIgnoredInProduction,

    /// The `.env` file exists but could not be read or parsed.
    UnreadableEnvFile { path: PathBuf, error: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::UnrecognizedLaunchMode(value) => write!(
                f,
                "unrecognized LAUNCH_MODE {value:?}, falling back to production settings"
            ),
            ConfigWarning::GeneratedSecretKey => f.write_str(
                "SECRET_KEY not set, generated a key for this process only; it will change on restart",
            ),
            ConfigWarning::DebugIgnoredInProduction => {
                f.write_str("DEBUG ignored in production launch mode")
            }
            ConfigWarning::UnreadableEnvFile { path, error } => {
                write!(f, "ignoring env file {}: {}", path.display(), error)
            }
        }
    }
}

/// Startup configuration failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more variables were missing or failed coercion.
    #[error("invalid configuration: {}", join_fields(.0))]
    Invalid(Vec<FieldError>),

    /// The environment could not be mapped onto the settings record.
    #[error("environment error: {0}")]
    Env(#[from] envy::Error),

    /// The process root could not be determined.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Field errors carried by this error, empty for non-field failures.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ConfigError::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Crate-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Driver or pool error, passed through untouched.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias using the crate error.
pub type Result<T> = std::result::Result<T, Error>;
