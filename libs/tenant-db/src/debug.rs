//! Debug namespaces and statement logging.
//!
//! Namespaces are opt-in: nothing is logged through this module unless the
//! corresponding [`DebugFlag`] is enabled in [`crate::OrmConfig::debug`].

use serde::{Deserialize, Serialize};

/// A debug logging namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebugFlag {
    /// Every SQL statement with its elapsed time.
    Query,
    /// Bound parameter values next to each statement (only alongside `query`).
    QueryParams,
    /// Schema manager operations.
    Schema,
    /// Entity discovery at init.
    Discovery,
    /// Connection lifecycle.
    Info,
}

impl DebugFlag {
    const ALL: [Self; 5] = [
        Self::Query,
        Self::QueryParams,
        Self::Schema,
        Self::Discovery,
        Self::Info,
    ];

    fn bit(self) -> u8 {
        match self {
            Self::Query => 1,
            Self::QueryParams => 1 << 1,
            Self::Schema => 1 << 2,
            Self::Discovery => 1 << 3,
            Self::Info => 1 << 4,
        }
    }
}

/// Set of enabled [`DebugFlag`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugFlags(u8);

impl DebugFlags {
    #[must_use]
    pub fn none() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn all() -> Self {
        DebugFlag::ALL.into_iter().collect()
    }

    #[must_use]
    pub fn contains(self, flag: DebugFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn logs_queries(self) -> bool {
        self.contains(DebugFlag::Query)
    }
}

impl FromIterator<DebugFlag> for DebugFlags {
    fn from_iter<I: IntoIterator<Item = DebugFlag>>(iter: I) -> Self {
        Self(iter.into_iter().fold(0, |acc, f| acc | f.bit()))
    }
}

/// Metric callback body installed on the `SeaORM` connection.
pub(crate) fn log_statement(flags: DebugFlags, info: &sea_orm::metric::Info<'_>) {
    let elapsed_ms = info.elapsed.as_secs_f64() * 1000.0;
    let sql = info.statement.sql.as_str();
    let params = flags
        .contains(DebugFlag::QueryParams)
        .then_some(info.statement.values.as_ref())
        .flatten();

    match (info.failed, params) {
        (true, Some(values)) => {
            tracing::warn!(target: "tenant_db::query", elapsed_ms, sql, params = ?values, "statement failed");
        }
        (true, None) => {
            tracing::warn!(target: "tenant_db::query", elapsed_ms, sql, "statement failed");
        }
        (false, Some(values)) => {
            tracing::info!(target: "tenant_db::query", elapsed_ms, sql, params = ?values, "query");
        }
        (false, None) => {
            tracing::info!(target: "tenant_db::query", elapsed_ms, sql, "query");
        }
    }
}
