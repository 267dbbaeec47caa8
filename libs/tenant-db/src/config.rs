//! ORM configuration.
//!
//! Configuration is layered with `figment`: struct defaults, then an optional
//! YAML file, then `TENANT_DB_*` environment variables (`__` separates nested
//! keys, e.g. `TENANT_DB_POOL__MAX_CONNS=4`).

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Serialize};

use crate::debug::{DebugFlag, DebugFlags};
use crate::{ConnectOpts, DbError, Result};

/// Environment variable prefix read by [`OrmConfig::load`].
pub const ENV_PREFIX: &str = "TENANT_DB_";

const MEMORY_DB_NAME: &str = ":memory:";

/// Top-level configuration handed to [`crate::Orm::init`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Full DSN. Takes the place of `db_name`; setting both is an error.
    pub dsn: Option<String>,
    /// `SQLite` database name: `:memory:` or a file path.
    pub db_name: Option<String>,
    /// `true`/`false`, or a list of namespaces such as `[query, query-params]`.
    pub debug: DebugSetting,
    /// Permit use of the shared entity manager returned by [`crate::Orm::em`].
    pub allow_global_context: bool,
    pub pool: PoolCfg,
}

/// Debug logging switch: everything, nothing, or selected namespaces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DebugSetting {
    Enabled(bool),
    Namespaces(Vec<DebugFlag>),
}

impl Default for DebugSetting {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl DebugSetting {
    #[must_use]
    pub fn flags(&self) -> DebugFlags {
        match self {
            Self::Enabled(true) => DebugFlags::all(),
            Self::Enabled(false) => DebugFlags::none(),
            Self::Namespaces(ns) => ns.iter().copied().collect(),
        }
    }
}

impl From<Vec<DebugFlag>> for DebugSetting {
    fn from(ns: Vec<DebugFlag>) -> Self {
        Self::Namespaces(ns)
    }
}

/// Connection pool knobs. Unset values keep [`ConnectOpts`] defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCfg {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub max_lifetime: Option<Duration>,
    pub test_before_acquire: bool,
}

impl OrmConfig {
    /// Extract from an already assembled figment.
    ///
    /// # Errors
    /// Returns `DbError::InvalidConfig` if the figment does not deserialize.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| DbError::InvalidConfig(e.to_string()))
    }

    /// Load defaults, then `path` (YAML) if given, then `TENANT_DB_*` env vars.
    ///
    /// # Errors
    /// Returns `DbError::InvalidConfig` if a source is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// DSN to connect to. Without `dsn` or `db_name` this is an in-memory `SQLite` database.
    ///
    /// # Errors
    /// Returns `DbError::InvalidConfig` if both `dsn` and `db_name` are set or
    /// `db_name` is blank.
    pub fn resolve_dsn(&self) -> Result<String> {
        match (self.dsn.as_deref(), self.db_name.as_deref()) {
            (Some(_), Some(_)) => Err(DbError::InvalidConfig(
                "`dsn` and `db_name` are mutually exclusive".to_owned(),
            )),
            (Some(dsn), None) => Ok(dsn.to_owned()),
            (None, None) => Ok("sqlite::memory:".to_owned()),
            (None, Some(name)) if name.trim().is_empty() => {
                Err(DbError::InvalidConfig("`db_name` must not be blank".to_owned()))
            }
            (None, Some(MEMORY_DB_NAME)) => Ok("sqlite::memory:".to_owned()),
            (None, Some(name)) => Ok(format!("sqlite://{name}?mode=rwc")),
        }
    }

    /// Pool options derived from [`PoolCfg`] over [`ConnectOpts::default`].
    #[must_use]
    pub fn connect_opts(&self) -> ConnectOpts {
        let defaults = ConnectOpts::default();
        let pool = &self.pool;
        ConnectOpts {
            max_conns: pool.max_conns.or(defaults.max_conns),
            min_conns: pool.min_conns.or(defaults.min_conns),
            acquire_timeout: pool.acquire_timeout.or(defaults.acquire_timeout),
            idle_timeout: pool.idle_timeout.or(defaults.idle_timeout),
            max_lifetime: pool.max_lifetime.or(defaults.max_lifetime),
            test_before_acquire: pool.test_before_acquire,
            ..defaults
        }
    }
}
