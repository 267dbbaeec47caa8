//! Filesystem preparation for file-backed `SQLite` databases.

use std::path::Path;

/// Create the parent directory of a file DSN's database when `create_dirs` is set.
///
/// # Errors
/// Returns an I/O error if the directory cannot be created.
pub fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> std::io::Result<()> {
    if !create_dirs {
        return Ok(());
    }
    let Some(file) = database_file(dsn) else {
        return Ok(());
    };
    match Path::new(file).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn database_file(dsn: &str) -> Option<&str> {
    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))?;
    let file = rest.split('?').next().unwrap_or(rest);
    if file.is_empty() || file.starts_with("file:") {
        None
    } else {
        Some(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested/deeper/app.db");
        let dsn = format!("sqlite://{}?mode=rwc", db.display());

        prepare_sqlite_path(&dsn, true).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }

    #[test]
    fn leaves_filesystem_alone_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("absent/app.db");
        let dsn = format!("sqlite://{}", db.display());

        prepare_sqlite_path(&dsn, false).unwrap();
        assert!(!db.parent().unwrap().exists());
    }
}
