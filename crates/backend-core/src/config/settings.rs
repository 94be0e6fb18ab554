//! Typed settings resolved from the environment.

use std::fmt;
use std::path::Path;

use serde::{Serialize, Serializer};
use url::Url;

use super::env::EnvSource;
use super::launch_mode::LaunchMode;
use super::parse::{generate_secret_key, parse_bool, parse_url_list, slugify};
use super::postgres::PostgresSettings;
use super::vars::*;
use crate::error::{ConfigError, ConfigWarning, FieldError};

const DEFAULT_PROJECT_NAME: &str = "Project_Example";
const DEFAULT_CORS_ORIGIN: &str = "http://127.0.0.1:8000/";
const DEFAULT_API_PREFIX: &str = "/api";
const DEFAULT_OFFSET_VALUE: u32 = 0;
const DEFAULT_LIMIT_VALUE: u32 = 25;

/// Signing secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    value: String,
    generated: bool,
}

impl SecretKey {
    fn provided(value: String) -> Self {
        Self {
            value,
            generated: false,
        }
    }

    fn generate() -> Self {
        Self {
            value: generate_secret_key(),
            generated: true,
        }
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    /// True when the key was generated for this process and will not
    /// survive a restart.
    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("value", &"<redacted>")
            .field("generated", &self.generated)
            .finish()
    }
}

impl Serialize for SecretKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<redacted>")
    }
}

/// Process settings.
///
/// Built once at startup and immutable afterwards. `project_slug` and
/// `database_url` are derived during construction and cannot drift from the
/// fields they come from.
#[derive(Clone, Serialize)]
pub struct Settings {
    mode: LaunchMode,
    project_name: String,
    project_slug: String,
    secret_key: SecretKey,
    debug: bool,
    backend_cors_origins: Vec<Url>,
    api_prefix: String,
    default_offset: u32,
    default_limit: u32,
    postgres: PostgresSettings,
    #[serde(skip_serializing)]
    database_url: String,
    json_logs: bool,
    #[serde(skip_serializing)]
    warnings: Vec<ConfigWarning>,
}

impl Settings {
    /// Resolve settings from the process environment and the `.env` file in
    /// the current working directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let root = std::env::current_dir()?;
        Self::from_env_in(&root)
    }

    /// Like [`Settings::from_env`] with an explicit process root.
    pub fn from_env_in(root: &Path) -> Result<Self, ConfigError> {
        let source = EnvSource::from_process(root)?;
        Self::resolve(&source)
    }

    /// Run the validation pass over `source`.
    ///
    /// Every field is checked before returning, so the error lists all
    /// missing and invalid variables rather than the first one found.
    pub fn resolve(source: &EnvSource) -> Result<Self, ConfigError> {
        let raw = source.raw()?;
        let mut errors = Vec::new();
        let mut warnings = source.warnings().to_vec();

        let mode = LaunchMode::resolve(raw.launch_mode.as_deref());
        if let Some(value) = raw.launch_mode.filter(|v| v.parse::<LaunchMode>().is_err()) {
            warnings.push(ConfigWarning::UnrecognizedLaunchMode(value));
        }

        let project_name = optional(
            &mut errors,
            PROJECT_NAME,
            raw.project_name,
            || DEFAULT_PROJECT_NAME.to_string(),
            text,
        );

        let secret_key = raw.secret_key.filter(|v| !v.is_empty());

        let debug = optional(&mut errors, DEBUG, raw.debug, || false, coerce_bool);

        let backend_cors_origins = optional(
            &mut errors,
            BACKEND_CORS_ORIGINS,
            raw.backend_cors_origins,
            default_cors_origins,
            parse_url_list,
        );

        let default_limit = optional(
            &mut errors,
            DEFAULT_LIMIT,
            raw.default_limit,
            || DEFAULT_LIMIT_VALUE,
            |v| {
                v.parse::<u32>()
                    .map_err(|_| "expected a non-negative integer".to_string())
            },
        );

        let host = required(&mut errors, POSTGRES_HOST, raw.postgres_host, text);
        let port = required(&mut errors, POSTGRES_PORT, raw.postgres_port, |v| {
            v.parse::<u16>()
                .map_err(|_| "expected a port number".to_string())
        });
        let user = required(&mut errors, POSTGRES_USER, raw.postgres_user, text);
        let password = required_secret(&mut errors, POSTGRES_PASSWORD, raw.postgres_password);
        let db = required(&mut errors, POSTGRES_DB, raw.postgres_db, text);

        let json_logs = optional(&mut errors, JSON_LOGS, raw.json_logs, || false, coerce_bool);

        let (Some(host), Some(port), Some(user), Some(password), Some(db), true) =
            (host, port, user, password, db, errors.is_empty())
        else {
            return Err(ConfigError::Invalid(errors));
        };

        let secret_key = match secret_key {
            Some(value) => SecretKey::provided(value),
            None => {
                warnings.push(ConfigWarning::GeneratedSecretKey);
                SecretKey::generate()
            }
        };

        let debug = if mode.is_production() {
            if debug {
                warnings.push(ConfigWarning::DebugIgnoredInProduction);
            }
            false
        } else {
            debug
        };

        let postgres = PostgresSettings {
            host,
            port,
            user,
            password,
            db,
        };

        Ok(Self {
            mode,
            project_slug: slugify(&project_name),
            project_name,
            secret_key,
            debug,
            backend_cors_origins,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            default_offset: DEFAULT_OFFSET_VALUE,
            default_limit,
            database_url: postgres.connection_url(),
            postgres,
            json_logs,
            warnings,
        })
    }

    /// Non-fatal problems met during resolution, in the order found.
    ///
    /// Resolution does not log; call
    /// [`telemetry::log_config_warnings`](crate::telemetry::log_config_warnings)
    /// once tracing is installed.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn project_slug(&self) -> &str {
        &self.project_slug
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn backend_cors_origins(&self) -> &[Url] {
        &self.backend_cors_origins
    }

    /// Origins (`scheme://host[:port]`) of the configured CORS URLs, in the
    /// form browsers send in the `Origin` header.
    pub fn cors_allowed_origins(&self) -> Vec<String> {
        self.backend_cors_origins
            .iter()
            .map(|url| url.origin().ascii_serialization())
            .collect()
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn default_offset(&self) -> u32 {
        self.default_offset
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub fn postgres(&self) -> &PostgresSettings {
        &self.postgres
    }

    /// `postgresql://{user}:{password}@{host}:{port}/{db}`
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn json_logs(&self) -> bool {
        self.json_logs
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("mode", &self.mode)
            .field("project_name", &self.project_name)
            .field("project_slug", &self.project_slug)
            .field("secret_key", &self.secret_key)
            .field("debug", &self.debug)
            .field("backend_cors_origins", &self.backend_cors_origins)
            .field("api_prefix", &self.api_prefix)
            .field("default_offset", &self.default_offset)
            .field("default_limit", &self.default_limit)
            .field("postgres", &self.postgres)
            .field("json_logs", &self.json_logs)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

fn default_cors_origins() -> Vec<Url> {
    parse_url_list(DEFAULT_CORS_ORIGIN).unwrap_or_default()
}

fn text(value: &str) -> Result<String, String> {
    Ok(value.to_string())
}

fn coerce_bool(value: &str) -> Result<bool, String> {
    parse_bool(value).ok_or_else(|| "expected a boolean".to_string())
}

/// Coerce an optional variable. Unset or empty means `default`.
fn optional<T>(
    errors: &mut Vec<FieldError>,
    var: &'static str,
    raw: Option<String>,
    default: impl FnOnce() -> T,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> T {
    match raw.as_deref().map(str::trim) {
        None | Some("") => default(),
        Some(value) => parse(value).unwrap_or_else(|reason| {
            errors.push(FieldError::invalid(var, Some(value), reason));
            default()
        }),
    }
}

/// Coerce a required variable. Unset or empty is recorded as missing.
fn required<T>(
    errors: &mut Vec<FieldError>,
    var: &'static str,
    raw: Option<String>,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Option<T> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(FieldError::missing(var));
            None
        }
        Some(value) => match parse(value) {
            Ok(parsed) => Some(parsed),
            Err(reason) => {
                errors.push(FieldError::invalid(var, Some(value), reason));
                None
            }
        },
    }
}

/// Required secret, kept exactly as given (no trimming).
fn required_secret(
    errors: &mut Vec<FieldError>,
    var: &'static str,
    raw: Option<String>,
) -> Option<String> {
    match raw {
        Some(value) if !value.is_empty() => Some(value),
        _ => {
            errors.push(FieldError::missing(var));
            None
        }
    }
}
