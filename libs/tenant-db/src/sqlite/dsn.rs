//! `SQLite` DSN handling.

use url::Url;

/// Query parameters consumed by [`super::Pragmas`]; anything else
/// (`mode`, `cache`, ...) stays in the DSN for sqlx.
const PRAGMA_KEYS: &[&str] = &[
    "journal_mode",
    "synchronous",
    "busy_timeout",
    "wal",
    "foreign_keys",
];

/// Split PRAGMA parameters out of a `SQLite` DSN.
///
/// Returns the DSN without those parameters plus the extracted `(key, value)`
/// pairs, keys lowercased and values percent-decoded. A DSN without a query
/// string, or one that does not parse as a URL, is returned unchanged.
#[must_use]
pub fn extract_sqlite_pragmas(dsn: &str) -> (String, Vec<(String, String)>) {
    if !dsn.contains('?') {
        return (dsn.to_owned(), Vec::new());
    }
    let Ok(mut url) = Url::parse(dsn) else {
        return (dsn.to_owned(), Vec::new());
    };

    let mut pragmas = Vec::new();
    let mut kept = Vec::new();
    for (key, value) in url.query_pairs() {
        let key_lc = key.to_ascii_lowercase();
        if PRAGMA_KEYS.contains(&key_lc.as_str()) {
            pragmas.push((key_lc, value.into_owned()));
        } else {
            kept.push((key.into_owned(), value.into_owned()));
        }
    }

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&kept);
    }
    (url.to_string(), pragmas)
}

/// Whether the DSN points at an in-memory database.
#[must_use]
pub fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}
