//! Process-wide database engine.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::session::{Session, SessionStats, SessionStatsSnapshot};
use crate::config::Settings;

/// Connection pool bounds.
///
/// Up to `pool_size + max_overflow` connections may be open at once. Once
/// all are checked out, further acquisitions wait up to `acquire_timeout`
/// and then fail with [`sqlx::Error::PoolTimedOut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub pool_size: u32,
    pub max_overflow: u32,
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn max_connections(&self) -> u32 {
        self.pool_size.saturating_add(self.max_overflow).max(1)
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_size: 100,
            max_overflow: 45,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Pooled connection manager handing out [`Session`]s.
///
/// Create one per process and share it by reference or clone; clones share
/// the same pool and counters.
#[derive(Clone)]
pub struct Engine {
    pool: PgPool,
    pool_settings: PoolSettings,
    stats: Arc<SessionStats>,
}

impl Engine {
    /// Build an engine with the default pool bounds.
    ///
    /// No connection is opened here; the first session that needs one
    /// connects. Must be called inside a Tokio runtime.
    pub fn new(settings: &Settings) -> Self {
        Self::with_pool_settings(settings, PoolSettings::default())
    }

    pub fn with_pool_settings(settings: &Settings, pool_settings: PoolSettings) -> Self {
        let postgres = settings.postgres();
        let pool = PgPoolOptions::new()
            .max_connections(pool_settings.max_connections())
            .min_connections(0)
            .acquire_timeout(pool_settings.acquire_timeout)
            .connect_lazy_with(postgres.connect_options());

        tracing::info!(
            host = %postgres.host,
            port = postgres.port,
            database = %postgres.db,
            pool_size = pool_settings.pool_size,
            max_overflow = pool_settings.max_overflow,
            "Database engine created"
        );

        Self {
            pool,
            pool_settings,
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Open a new session. Exactly one session is created per call.
    pub fn session(&self) -> Session {
        Session::new(self.pool.clone(), self.stats.clone())
    }

    /// Run `f` with a fresh session and close it afterwards, whatever `f`
    /// returns.
    ///
    /// Work is committed only if `f` calls [`Session::commit`]. When both
    /// `f` and the close fail, the error from `f` is returned.
    ///
    /// ```ignore
    /// let count: i64 = engine
    ///     .scoped(|session| Box::pin(async move {
    ///         let row: (i64,) = sqlx::query_as("SELECT count(*) FROM items")
    ///             .fetch_one(session.conn().await?)
    ///             .await?;
    ///         Ok::<_, sqlx::Error>(row.0)
    ///     }))
    ///     .await?;
    /// ```
    pub async fn scoped<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>>,
        E: From<sqlx::Error>,
    {
        let mut session = self.session();
        let result = f(&mut session).await;
        let closed = session.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Round-trip `SELECT 1` through a scoped session.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        self.scoped(|session| {
            Box::pin(async move {
                sqlx::query("SELECT 1").execute(session.conn().await?).await?;
                Ok(())
            })
        })
        .await
    }

    /// Underlying pool, for hosts that need direct access.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn pool_settings(&self) -> PoolSettings {
        self.pool_settings
    }

    pub fn stats(&self) -> SessionStatsSnapshot {
        self.stats.snapshot()
    }

    /// Close the pool. Outstanding connections are closed as they are
    /// returned.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database engine closed");
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pool_settings", &self.pool_settings)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvSource;

    /// Settings pointing at a port nothing listens on.
    fn unreachable_settings() -> Settings {
        Settings::resolve(&EnvSource::from_pairs([
            ("POSTGRES_HOST", "127.0.0.1"),
            ("POSTGRES_PORT", "1"),
            ("POSTGRES_USER", "nobody"),
            ("POSTGRES_PASSWORD", "nothing"),
            ("POSTGRES_DB", "none"),
            ("SECRET_KEY", "test"),
        ]))
        .unwrap()
    }

    fn quick_pool() -> PoolSettings {
        PoolSettings {
            pool_size: 2,
            max_overflow: 1,
            acquire_timeout: Duration::from_millis(250),
        }
    }

    #[test]
    fn test_default_pool_settings() {
        let pool = PoolSettings::default();
        assert_eq!(pool.pool_size, 100);
        assert_eq!(pool.max_overflow, 45);
        assert_eq!(pool.max_connections(), 145);
    }

    #[tokio::test]
    async fn test_engine_is_lazy() {
        let engine = Engine::new(&unreachable_settings());
        assert_eq!(engine.pool().options().get_max_connections(), 145);
        assert_eq!(engine.pool().size(), 0);
        assert_eq!(engine.stats().opened, 0);
    }

    #[tokio::test]
    async fn test_one_session_per_call() {
        let engine = Engine::with_pool_settings(&unreachable_settings(), quick_pool());
        let a = engine.session();
        let b = engine.session();
        assert_ne!(a.id(), b.id());
        assert_eq!(engine.stats().opened, 2);
        assert_eq!(engine.stats().active(), 2);
        drop(a);
        drop(b);
        assert_eq!(engine.stats().closed, 2);
    }

    #[tokio::test]
    async fn test_close_counts_once() {
        let engine = Engine::with_pool_settings(&unreachable_settings(), quick_pool());
        let session = engine.session();
        assert!(!session.in_transaction());
        session.close().await.unwrap();
        assert_eq!(
            engine.stats(),
            SessionStatsSnapshot {
                opened: 1,
                closed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_scoped_closes_on_success_and_error() {
        let engine = Engine::with_pool_settings(&unreachable_settings(), quick_pool());

        let value = engine
            .scoped(|session| Box::pin(async move { Ok::<_, sqlx::Error>(session.id()) }))
            .await
            .unwrap();
        assert_eq!(value, 1);

        let err = engine
            .scoped(|_session| Box::pin(async move { Err::<(), _>(sqlx::Error::RowNotFound) }))
            .await
            .unwrap_err();
        assert!(matches!(err, sqlx::Error::RowNotFound));

        assert_eq!(engine.stats().opened, 2);
        assert_eq!(engine.stats().closed, 2);
    }

    #[tokio::test]
    async fn test_session_closed_on_panic() {
        let engine = Engine::with_pool_settings(&unreachable_settings(), quick_pool());
        let task_engine = engine.clone();
        let handle = tokio::spawn(async move {
            let _session = task_engine.session();
            panic!("unit of work failed")
        });
        let result: Result<(), _> = handle.await;
        assert!(result.unwrap_err().is_panic());
        assert_eq!(engine.stats().opened, 1);
        assert_eq!(engine.stats().closed, 1);
    }

    #[tokio::test]
    async fn test_connection_failure_surfaces() {
        let engine = Engine::with_pool_settings(&unreachable_settings(), quick_pool());
        let result = engine.health_check().await;
        assert!(result.is_err());
        assert_eq!(engine.stats().active(), 0);
        assert_eq!(engine.stats().closed, 1);
    }

    #[tokio::test]
    async fn test_pool_cap_is_base_plus_overflow() {
        let engine = Engine::with_pool_settings(&unreachable_settings(), quick_pool());
        assert_eq!(engine.pool().options().get_max_connections(), 3);
        assert_eq!(
            engine.pool().options().get_acquire_timeout(),
            Duration::from_millis(250)
        );
    }

    // The tests below need a reachable PostgreSQL configured through
    // POSTGRES_* and run with `cargo test -- --ignored`. They are the only
    // coverage of pool exhaustion itself; without a database only the
    // configured cap above is checked.

    fn live_settings() -> Settings {
        Settings::from_env().expect("POSTGRES_* must be set for live tests")
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn test_live_health_check() {
        let engine = Engine::new(&live_settings());
        engine.health_check().await.unwrap();
        engine.close().await;
    }

    /// Every session up to `pool_size + max_overflow` gets a connection;
    /// the next one times out waiting.
    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn test_live_pool_bound() {
        let engine = Engine::with_pool_settings(&live_settings(), quick_pool());
        let mut sessions = Vec::new();
        for _ in 0..quick_pool().max_connections() {
            let mut session = engine.session();
            session.conn().await.unwrap();
            sessions.push(session);
        }

        let mut extra = engine.session();
        let err = extra.conn().await.unwrap_err();
        assert!(matches!(err, sqlx::Error::PoolTimedOut));

        drop(sessions);
        drop(extra);
        assert_eq!(engine.stats().active(), 0);
        engine.close().await;
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn test_live_uncommitted_work_is_rolled_back() {
        let engine = Engine::with_pool_settings(&live_settings(), quick_pool());
        engine
            .scoped(|session| {
                Box::pin(async move {
                    sqlx::query("CREATE TEMP TABLE IF NOT EXISTS scratch (n int)")
                        .execute(session.conn().await?)
                        .await?;
                    session.commit().await?;
                    sqlx::query("INSERT INTO scratch VALUES (1)")
                        .execute(session.conn().await?)
                        .await?;
                    Ok::<_, sqlx::Error>(())
                })
            })
            .await
            .unwrap();
        assert_eq!(engine.stats().active(), 0);
        engine.close().await;
    }
}
