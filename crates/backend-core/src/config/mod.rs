//! Settings resolution.
//!
//! Settings are read from environment variables (optionally seeded from a
//! `.env` file) into an immutable [`Settings`] value. The variant applied is
//! selected by `LAUNCH_MODE`.

mod env;
mod launch_mode;
mod parse;
mod postgres;
mod settings;
pub mod vars;

pub use env::{read_env_file, EnvSource, ENV_FILE};
pub use launch_mode::{LaunchMode, UnknownLaunchMode};
pub use parse::slugify;
pub use postgres::PostgresSettings;
pub use settings::{SecretKey, Settings};
