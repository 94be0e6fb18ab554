//! Backend core: settings and database sessions for a backend service.
//!
//! - [`config`]: typed [`Settings`](config::Settings) resolved from
//!   environment variables and an optional `.env` file, with the variant
//!   selected by `LAUNCH_MODE`
//! - [`db`]: a pooled [`Engine`](db::Engine) handing out scoped
//!   [`Session`](db::Session)s that are always released
//! - [`telemetry`]: tracing setup honoring `JSON_LOGS`
//!
//! Settings are built once at process entry and passed to whatever needs
//! them; nothing here is global.
//!
//! ```ignore
//! use backend_core::{config::Settings, db::Engine, telemetry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     telemetry::init_tracing(&settings);
//!     let engine = Engine::new(&settings);
//!
//!     let mut session = engine.session();
//!     sqlx::query("SELECT 1").execute(session.conn().await?).await?;
//!     session.commit().await?;
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod result_ext;
pub mod telemetry;

pub use error::{ConfigError, ConfigWarning, Error, FieldError, Result};
pub use result_ext::ResultExt;
