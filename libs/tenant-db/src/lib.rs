#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant-aware ORM lifecycle layer over `SeaORM`.
//!
//! The crate wraps a `SeaORM` connection with the lifecycle an application
//! expects from a full ORM:
//! - typed configuration loaded with `figment` ([`OrmConfig`])
//! - an ordered entity registry that drives commit order ([`EntityRegistry`])
//! - schema bootstrap through `sea-orm-migration` ([`orm::SchemaManager`])
//! - a unit of work with explicit flush ([`EntityManager`])
//! - eager population of related collections and tenant-scoped lookups
//!
//! # Features
//! - `sqlite` (default), `pg`, `mysql`: enable `SQLx` backends
//!
//! # Example
//! ```rust,no_run
//! use tenant_db::{EntityRegistry, Orm, OrmConfig};
//!
//! # async fn run(registry: EntityRegistry) -> tenant_db::Result<()> {
//! let config = OrmConfig {
//!     db_name: Some(":memory:".to_owned()),
//!     allow_global_context: true,
//!     ..OrmConfig::default()
//! };
//! let orm = Orm::init(config, registry).await?;
//! let em = orm.em()?;
//! assert_eq!(em.pending_changes(), 0);
//! orm.close(false).await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(
    not(any(feature = "pg", feature = "mysql", feature = "sqlite")),
    allow(
        unused_imports,
        unused_variables,
        dead_code,
        unreachable_code,
        unused_lifetimes,
        clippy::unused_async,
    )
)]

pub use sea_orm::ConnectionTrait as DbConnTrait;

pub mod config;
pub mod debug;
pub mod entity_manager;
pub mod metadata;
pub mod orm;
pub mod secure;

mod pool_opts;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use config::{DebugSetting, OrmConfig, PoolCfg};
pub use debug::{DebugFlag, DebugFlags};
pub use entity_manager::{EntityManager, Populated};
pub use metadata::{EntityMeta, EntityRegistry};
pub use orm::{Orm, SchemaManager};

use std::time::Duration;

#[cfg(any(feature = "pg", feature = "mysql", feature = "sqlite"))]
use pool_opts::ApplyPoolOpts;
#[cfg(feature = "sqlite")]
use sqlite::{Pragmas, extract_sqlite_pragmas, is_memory_dsn, prepare_sqlite_path};

#[cfg(feature = "mysql")]
use sea_orm::sqlx::{MySqlPool, mysql::MySqlPoolOptions};
#[cfg(feature = "pg")]
use sea_orm::sqlx::{PgPool, postgres::PgPoolOptions};
#[cfg(feature = "sqlite")]
use sea_orm::sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

use sea_orm::DatabaseConnection;
#[cfg(feature = "mysql")]
use sea_orm::SqlxMySqlConnector;
#[cfg(feature = "pg")]
use sea_orm::SqlxPostgresConnector;
#[cfg(feature = "sqlite")]
use sea_orm::SqlxSqliteConnector;

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the ORM layer.
///
/// Engine errors (constraint violations, connection failures) are carried
/// through unchanged in [`DbError::Sea`] / [`DbError::Sqlx`].
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid SQLite PRAGMA parameter '{key}': {message}")]
    InvalidSqlitePragma { key: String, message: String },

    #[error("Entity '{0}' is not registered with this ORM instance")]
    UnknownEntity(&'static str),

    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error(
        "Using the global entity manager is disallowed; fork() a context or set allow_global_context"
    )]
    GlobalContextDisallowed,

    #[error("Schema mismatch: table '{table}' for entity '{entity}' does not exist")]
    SchemaMismatch { entity: &'static str, table: String },

    #[error("{0} unflushed change(s) pending in the global unit of work")]
    PendingChanges(usize),

    #[error("Flush failed while writing '{table}': {source}")]
    Flush {
        table: String,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error(transparent)]
    Scope(#[from] secure::ScopeError),

    #[cfg(any(feature = "pg", feature = "mysql", feature = "sqlite"))]
    #[error(transparent)]
    Sqlx(#[from] sea_orm::sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

/// Connection options.
/// Each driver applies the subset of pool knobs it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime for a connection.
    pub max_lifetime: Option<Duration>,
    /// Test connection health before acquire.
    pub test_before_acquire: bool,
    /// For `SQLite` file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
            create_sqlite_dirs: true,
        }
    }
}

/// One concrete sqlx pool.
#[derive(Clone, Debug)]
pub enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Main handle.
///
/// Clones share one pool.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Detect engine by DSN.
    ///
    /// Only scheme prefixes are checked; the tail (credentials etc.) is left alone.
    ///
    /// # Errors
    /// Returns `DbError::UnknownDsn` if the DSN scheme is not recognized.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();

        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("mysql://") {
            Ok(DbEngine::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_owned()))
        }
    }

    /// Connect and build handle.
    ///
    /// # Errors
    /// Returns an error if the connection fails or the DSN is invalid.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let pool = PgPoolOptions::new().apply(&opts).connect(dsn).await?;
                let sea = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::Postgres(pool),
                    dsn: dsn.to_owned(),
                    sea,
                })
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => Err(DbError::FeatureDisabled("PostgreSQL feature not enabled")),
            #[cfg(feature = "mysql")]
            DbEngine::MySql => {
                let pool = MySqlPoolOptions::new().apply(&opts).connect(dsn).await?;
                let sea = SqlxMySqlConnector::from_sqlx_mysql_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::MySql(pool),
                    dsn: dsn.to_owned(),
                    sea,
                })
            }
            #[cfg(not(feature = "mysql"))]
            DbEngine::MySql => Err(DbError::FeatureDisabled("MySQL feature not enabled")),
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => Self::connect_sqlite(dsn, &opts).await,
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        }
    }

    #[cfg(feature = "sqlite")]
    async fn connect_sqlite(dsn: &str, opts: &ConnectOpts) -> Result<Self> {
        let (clean_dsn, pairs) = extract_sqlite_pragmas(dsn);
        let pragmas = Pragmas::from_pairs(&pairs)?;
        let is_memory = is_memory_dsn(&clean_dsn);
        if !is_memory {
            prepare_sqlite_path(&clean_dsn, opts.create_sqlite_dirs)?;
        }

        let mut o = SqlitePoolOptions::new().apply(opts);
        if is_memory {
            // Every connection to `:memory:` opens a distinct database, so the
            // pool holds exactly one connection that never expires.
            o = o
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        o = o.after_connect(move |conn, _meta| {
            let pragmas = pragmas.clone();
            Box::pin(async move { pragmas.apply(conn, is_memory).await })
        });

        let pool = o.connect(&clean_dsn).await?;
        let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());

        Ok(Self {
            engine: DbEngine::Sqlite,
            pool: DbPool::Sqlite(pool),
            dsn: clean_dsn,
            sea,
        })
    }

    /// Route every statement executed through the `SeaORM` connection to the
    /// statement logger configured by `flags`. No-op when `query` logging is off.
    pub fn set_statement_logger(&mut self, flags: DebugFlags) {
        if flags.logs_queries() {
            self.sea
                .set_metric_callback(move |info| debug::log_statement(flags, info));
        }
    }

    /// Close the pool. Every clone of this handle, and every `SeaORM`
    /// connection taken from it, shares the closed pool afterwards.
    pub async fn close(&self) {
        match &self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "mysql")]
            DbPool::MySql(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
    }

    /// Get the backend.
    #[must_use]
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Get the DSN used for this connection (pragma parameters stripped).
    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// `SeaORM` connection sharing this handle's pool.
    #[must_use]
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlx_sqlite(&self) -> Option<&SqlitePool> {
        match self.pool {
            DbPool::Sqlite(ref p) => Some(p),
            #[cfg(any(feature = "pg", feature = "mysql"))]
            _ => None,
        }
    }
}

/// `dsn` with any password masked, for logs.
#[must_use]
pub fn redact_credentials_in_dsn(dsn: &str) -> String {
    match url::Url::parse(dsn) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("***")).is_err() {
                return "***".to_owned();
            }
            parsed.to_string()
        }
        Err(_) if dsn.contains('@') => "***".to_owned(),
        _ => dsn.to_owned(),
    }
}

// ===================== tests =====================

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn backend_detection() {
        assert_eq!(
            DbHandle::detect("sqlite::memory:").unwrap(),
            DbEngine::Sqlite
        );
        assert_eq!(
            DbHandle::detect("  postgres://localhost/test").unwrap(),
            DbEngine::Postgres
        );
        assert_eq!(
            DbHandle::detect("mysql://localhost/test").unwrap(),
            DbEngine::MySql
        );
        assert!(matches!(
            DbHandle::detect("unknown://test"),
            Err(DbError::UnknownDsn(_))
        ));
    }

    #[test]
    fn passwords_are_redacted() {
        assert_eq!(
            redact_credentials_in_dsn("postgres://app:s3cret@db:5432/roles"),
            "postgres://app:***@db:5432/roles"
        );
        assert_eq!(redact_credentials_in_dsn("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(redact_credentials_in_dsn("not a url @ all"), "***");
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn memory_database_survives_across_statements() -> Result<()> {
        let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
        assert_eq!(db.engine(), DbEngine::Sqlite);

        let pool = db.sqlx_sqlite().unwrap();
        sea_orm::sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .execute(pool)
            .await?;
        sea_orm::sqlx::query("INSERT INTO t (name) VALUES (?)")
            .bind("one")
            .execute(pool)
            .await?;

        let (count,): (i64,) = sea_orm::sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(pool)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn pragma_parameters_are_stripped_and_applied() -> Result<()> {
        let dsn = "sqlite::memory:?synchronous=FULL&foreign_keys=false";
        let db = DbHandle::connect(dsn, ConnectOpts::default()).await?;
        assert_eq!(db.dsn(), "sqlite::memory:");

        let pool = db.sqlx_sqlite().unwrap();
        let (fk,): (i64,) = sea_orm::sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(pool)
            .await?;
        assert_eq!(fk, 0);
        Ok(())
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn percent_encoded_pragma_values_are_accepted() -> Result<()> {
        let db = DbHandle::connect("sqlite::memory:?foreign_keys=%66alse", ConnectOpts::default())
            .await?;
        let (fk,): (i64,) = sea_orm::sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(db.sqlx_sqlite().unwrap())
            .await?;
        assert_eq!(fk, 0);
        Ok(())
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn foreign_keys_are_on_by_default() -> Result<()> {
        let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
        let pool = db.sqlx_sqlite().unwrap();
        let (fk,): (i64,) = sea_orm::sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(pool)
            .await?;
        assert_eq!(fk, 1);
        db.close().await;
        Ok(())
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn invalid_pragma_value_is_rejected() {
        let err = DbHandle::connect("sqlite::memory:?synchronous=SOMETIMES", ConnectOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidSqlitePragma { ref key, .. } if key == "synchronous"));
    }

    #[cfg(not(feature = "pg"))]
    #[tokio::test]
    async fn disabled_engine_is_reported() {
        let err = DbHandle::connect("postgres://localhost/db", ConnectOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::FeatureDisabled(_)));
    }
}
