//! Typed `SQLite` PRAGMA parameters accepted in the DSN query string.

use sea_orm::sqlx::SqliteConnection;

use crate::{DbError, Result};

const DEFAULT_BUSY_TIMEOUT_MS: i64 = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_uppercase().as_str() {
            "DELETE" => Self::Delete,
            "TRUNCATE" => Self::Truncate,
            "PERSIST" => Self::Persist,
            "MEMORY" => Self::Memory,
            "WAL" => Self::Wal,
            "OFF" => Self::Off,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    Off,
    Normal,
    Full,
    Extra,
}

impl SyncMode {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
            Self::Extra => "EXTRA",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_uppercase().as_str() {
            "OFF" => Self::Off,
            "NORMAL" => Self::Normal,
            "FULL" => Self::Full,
            "EXTRA" => Self::Extra,
            _ => return None,
        })
    }
}

/// PRAGMA settings applied to every new `SQLite` connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pragmas {
    pub journal_mode: Option<JournalMode>,
    pub wal_toggle: Option<bool>,
    pub synchronous: Option<SyncMode>,
    pub busy_timeout_ms: Option<i64>,
    pub foreign_keys: Option<bool>,
}

impl Pragmas {
    /// Build from `(key, value)` pairs produced by
    /// [`extract_sqlite_pragmas`](super::extract_sqlite_pragmas).
    ///
    /// # Errors
    /// Returns `DbError::InvalidSqlitePragma` for a value that does not parse.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self> {
        let mut p = Self::default();
        for (key, value) in pairs {
            let invalid = |message: &str| DbError::InvalidSqlitePragma {
                key: key.clone(),
                message: format!("{message}, got '{value}'"),
            };
            match key.as_str() {
                "journal_mode" => {
                    p.journal_mode = Some(JournalMode::parse(value).ok_or_else(|| {
                        invalid("expected DELETE|TRUNCATE|PERSIST|MEMORY|WAL|OFF")
                    })?);
                }
                "synchronous" => {
                    p.synchronous = Some(
                        SyncMode::parse(value)
                            .ok_or_else(|| invalid("expected OFF|NORMAL|FULL|EXTRA"))?,
                    );
                }
                "busy_timeout" => {
                    let ms = value
                        .parse::<i64>()
                        .ok()
                        .filter(|ms| *ms >= 0)
                        .ok_or_else(|| invalid("expected a non-negative integer"))?;
                    p.busy_timeout_ms = Some(ms);
                }
                "wal" => {
                    p.wal_toggle =
                        Some(parse_bool(value).ok_or_else(|| invalid("expected a boolean"))?);
                }
                "foreign_keys" => {
                    p.foreign_keys =
                        Some(parse_bool(value).ok_or_else(|| invalid("expected a boolean"))?);
                }
                _ => {}
            }
        }
        Ok(p)
    }

    /// PRAGMA statements for one new connection, in execution order.
    ///
    /// Journal mode defaults to `MEMORY` for in-memory databases and `WAL`
    /// otherwise; foreign keys default to on. In-memory databases skip
    /// `busy_timeout`.
    #[must_use]
    pub fn statements(&self, is_memory: bool) -> Vec<String> {
        let journal_mode = match (self.journal_mode, self.wal_toggle) {
            (Some(mode), _) => mode.as_sql(),
            (None, Some(true)) => "WAL",
            (None, Some(false)) => "DELETE",
            (None, None) if is_memory => "MEMORY",
            (None, None) => "WAL",
        };
        let sync_mode = self.synchronous.map_or("NORMAL", SyncMode::as_sql);
        let fk = if self.foreign_keys.unwrap_or(true) { "ON" } else { "OFF" };

        let mut stmts = vec![
            format!("PRAGMA journal_mode = {journal_mode}"),
            format!("PRAGMA synchronous = {sync_mode}"),
            format!("PRAGMA foreign_keys = {fk}"),
        ];
        if !is_memory {
            let timeout = self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
            stmts.push(format!("PRAGMA busy_timeout = {timeout}"));
        }
        stmts
    }

    /// Run [`Self::statements`] on `conn`.
    ///
    /// # Errors
    /// Returns the driver error of the first PRAGMA that fails.
    pub async fn apply(
        &self,
        conn: &mut SqliteConnection,
        is_memory: bool,
    ) -> std::result::Result<(), sea_orm::sqlx::Error> {
        for stmt in self.statements(is_memory) {
            sea_orm::sqlx::query(&stmt).execute(&mut *conn).await?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn parses_known_pragmas() {
        let p = Pragmas::from_pairs(&pairs(&[
            ("journal_mode", "wal"),
            ("synchronous", "full"),
            ("busy_timeout", "250"),
            ("foreign_keys", "off"),
        ]))
        .unwrap();

        assert_eq!(p.journal_mode, Some(JournalMode::Wal));
        assert_eq!(p.synchronous, Some(SyncMode::Full));
        assert_eq!(p.busy_timeout_ms, Some(250));
        assert_eq!(p.foreign_keys, Some(false));
        assert_eq!(p.wal_toggle, None);
    }

    #[test]
    fn rejects_negative_busy_timeout() {
        let err = Pragmas::from_pairs(&pairs(&[("busy_timeout", "-1")])).unwrap_err();
        assert!(matches!(err, DbError::InvalidSqlitePragma { ref key, .. } if key == "busy_timeout"));
    }

    #[test]
    fn statements_follow_defaults_and_overrides() {
        let defaults = Pragmas::default();
        assert_eq!(
            defaults.statements(true),
            vec![
                "PRAGMA journal_mode = MEMORY",
                "PRAGMA synchronous = NORMAL",
                "PRAGMA foreign_keys = ON",
            ]
        );
        assert_eq!(
            defaults.statements(false).last().map(String::as_str),
            Some("PRAGMA busy_timeout = 5000")
        );

        let p = Pragmas::from_pairs(&pairs(&[("wal", "false"), ("foreign_keys", "0")])).unwrap();
        let stmts = p.statements(false);
        assert_eq!(stmts[0], "PRAGMA journal_mode = DELETE");
        assert_eq!(stmts[2], "PRAGMA foreign_keys = OFF");
    }

    #[test]
    fn rejects_unparsable_boolean() {
        assert!(Pragmas::from_pairs(&pairs(&[("wal", "maybe")])).is_err());
    }
}
