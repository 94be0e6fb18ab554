//! Environment variable names read by the settings schema.
//!
//! Names are matched exactly; `postgres_host` is not `POSTGRES_HOST`.

pub const LAUNCH_MODE: &str = "LAUNCH_MODE";
pub const PROJECT_NAME: &str = "PROJECT_NAME";
pub const SECRET_KEY: &str = "SECRET_KEY";
pub const DEBUG: &str = "DEBUG";
pub const BACKEND_CORS_ORIGINS: &str = "BACKEND_CORS_ORIGINS";
pub const DEFAULT_LIMIT: &str = "DEFAULT_LIMIT";
pub const POSTGRES_HOST: &str = "POSTGRES_HOST";
pub const POSTGRES_PORT: &str = "POSTGRES_PORT";
pub const POSTGRES_USER: &str = "POSTGRES_USER";
pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const POSTGRES_DB: &str = "POSTGRES_DB";
pub const JSON_LOGS: &str = "JSON_LOGS";

/// Gate for loading the `.env` file, read from the process environment only.
pub const READ_ENV: &str = "READ_ENV";

/// Every variable the settings schema consumes.
pub const SCHEMA: [&str; 12] = [
    LAUNCH_MODE,
    PROJECT_NAME,
    SECRET_KEY,
    DEBUG,
    BACKEND_CORS_ORIGINS,
    DEFAULT_LIMIT,
    POSTGRES_HOST,
    POSTGRES_PORT,
    POSTGRES_USER,
    POSTGRES_PASSWORD,
    POSTGRES_DB,
    JSON_LOGS,
];
