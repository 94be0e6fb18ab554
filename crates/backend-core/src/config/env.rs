//! Environment snapshot that settings are resolved against.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::parse::parse_bool;
use super::vars::{READ_ENV, SCHEMA};
use crate::error::{ConfigError, ConfigWarning, FieldError};

/// Name of the optional dotenv file at the process root.
pub const ENV_FILE: &str = ".env";

/// Immutable set of `KEY=VALUE` pairs.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: BTreeMap<String, String>,
    warnings: Vec<ConfigWarning>,
}

impl EnvSource {
    /// Build a source from explicit pairs. Later pairs win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            warnings: Vec::new(),
        }
    }

    /// Snapshot the process environment, layered over `<root>/.env` when
    /// `READ_ENV` allows it. The process environment is never modified.
    pub fn from_process(root: &Path) -> Result<Self, ConfigError> {
        let process = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::from_parts(process, root)
    }

    /// Layer `process` over `<root>/.env`.
    ///
    /// `READ_ENV` is looked up in `process` only (default `true`); an
    /// unparsable value is a configuration error. Entries in `process`
    /// always take precedence over file entries.
    pub fn from_parts<I>(process: I, root: &Path) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let process: Vec<(String, String)> = process.into_iter().collect();

        let read_env = match process.iter().rev().find(|(k, _)| k == READ_ENV) {
            Some((_, value)) => parse_bool(value).ok_or_else(|| {
                ConfigError::Invalid(vec![FieldError::invalid(
                    READ_ENV,
                    Some(value),
                    "expected a boolean",
                )])
            })?,
            None => true,
        };

        let mut source = Self::default();
        if read_env {
            let path = root.join(ENV_FILE);
            match read_env_file(&path) {
                Ok(entries) => source.vars.extend(entries),
                Err(e) => source.warnings.push(ConfigWarning::UnreadableEnvFile {
                    path,
                    error: e.to_string(),
                }),
            }
        } else {
            tracing::debug!("READ_ENV is false, skipping {}", ENV_FILE);
        }
        source.vars.extend(process);
        Ok(source)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Problems met while building the source, such as a malformed `.env`.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Map the schema variables onto [`RawEnv`].
    ///
    /// envy folds key case, so keys are filtered to the exact schema names
    /// first; `debug` or `postgres_host` never stand in for the real ones.
    pub(crate) fn raw(&self) -> Result<RawEnv, envy::Error> {
        envy::from_iter(
            self.vars
                .iter()
                .filter(|(k, _)| SCHEMA.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }
}

/// Parse a dotenv file without touching the process environment.
///
/// A missing file yields no entries. Any other failure, including a
/// malformed line, is returned so the caller can skip the file as a whole.
pub fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, dotenvy::Error> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => {
            tracing::debug!(path = %path.display(), "No env file found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let entries = iter.collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded env file");
    Ok(entries)
}

/// Uncoerced view of every variable the settings schema reads.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawEnv {
    pub launch_mode: Option<String>,
    pub project_name: Option<String>,
    pub secret_key: Option<String>,
    pub debug: Option<String>,
    pub backend_cors_origins: Option<String>,
    pub default_limit: Option<String>,
    pub postgres_host: Option<String>,
    pub postgres_port: Option<String>,
    pub postgres_user: Option<String>,
    pub postgres_password: Option<String>,
    pub postgres_db: Option<String>,
    pub json_logs: Option<String>,
}
