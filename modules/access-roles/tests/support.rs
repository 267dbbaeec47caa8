#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Test support utilities for `access_roles` integration tests.

#![allow(dead_code)]

use access_roles::domain::RoleDirectory;
use access_roles::infra::storage::{entities, migrations::Migrator};
use tenant_db::{DebugFlag, Orm, OrmConfig};

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_test_logging() {
    // A subscriber installed by an earlier test is fine.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init()
        .ok();
}

/// ORM settings for tests: private in-memory database, SQL logging, global context allowed.
#[must_use]
pub fn test_config() -> OrmConfig {
    OrmConfig {
        db_name: Some(":memory:".to_owned()),
        debug: vec![DebugFlag::Query, DebugFlag::QueryParams].into(),
        allow_global_context: true,
        ..OrmConfig::default()
    }
}

/// Connect to a fresh in-memory database with the module schema applied.
pub async fn init_orm() -> Orm {
    init_test_logging();
    let orm = Orm::init(test_config(), entities())
        .await
        .expect("ORM init");
    orm.schema::<Migrator>()
        .refresh_database()
        .await
        .expect("schema refresh");
    orm
}

/// A role directory over a forked entity manager.
pub fn directory(orm: &Orm) -> RoleDirectory {
    RoleDirectory::new(orm.fork())
}
