//! Database engine and scoped sessions over PostgreSQL using SQLx.

pub mod engine;
pub mod session;

pub use engine::{Engine, PoolSettings};
pub use session::{Session, SessionStats, SessionStatsSnapshot};
