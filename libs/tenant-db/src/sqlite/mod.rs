//! SQLite-specific helpers.
//!
//! - DSN parsing and cleaning
//! - PRAGMA parameter handling with typed enums
//! - Path preparation for file-backed databases

pub mod dsn;
pub mod path;
pub mod pragmas;

pub use dsn::{extract_sqlite_pragmas, is_memory_dsn};
pub use path::prepare_sqlite_path;
pub use pragmas::Pragmas;
