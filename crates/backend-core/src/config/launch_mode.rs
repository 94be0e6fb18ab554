//! Launch mode selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which settings variant governs the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LaunchMode {
    #[serde(rename = "local")]
    Local,

    #[default]
    #[serde(rename = "prod")]
    Production,

    #[serde(rename = "test")]
    Test,
}

impl LaunchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchMode::Local => "local",
            LaunchMode::Production => "prod",
            LaunchMode::Test => "test",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, LaunchMode::Production)
    }

    /// Resolve the `LAUNCH_MODE` value.
    ///
    /// Unset and unrecognized values both fall back to production.
    pub fn resolve(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok())
            .unwrap_or(LaunchMode::Production)
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of `local`, `prod` or `test`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLaunchMode(pub String);

impl fmt::Display for UnknownLaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown launch mode {:?}", self.0)
    }
}

impl std::error::Error for UnknownLaunchMode {}

impl FromStr for LaunchMode {
    type Err = UnknownLaunchMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(LaunchMode::Local),
            "prod" => Ok(LaunchMode::Production),
            "test" => Ok(LaunchMode::Test),
            other => Err(UnknownLaunchMode(other.to_string())),
        }
    }
}
