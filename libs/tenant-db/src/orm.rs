//! ORM lifecycle: init, schema bootstrap, entity managers, close.

use std::marker::PhantomData;
use std::sync::Arc;

use sea_orm_migration::MigratorTrait;

use crate::config::OrmConfig;
use crate::debug::{DebugFlag, DebugFlags};
use crate::entity_manager::EntityManager;
use crate::metadata::EntityRegistry;
use crate::{DbError, DbHandle, Result, redact_credentials_in_dsn};

/// An initialized ORM instance.
#[derive(Debug)]
pub struct Orm {
    handle: DbHandle,
    config: OrmConfig,
    flags: DebugFlags,
    registry: Arc<EntityRegistry>,
    global: EntityManager,
}

impl Orm {
    /// Connect according to `config` and take ownership of the entity list.
    ///
    /// # Errors
    /// - `DbError::InvalidConfig` for an empty registry or an unusable target
    /// - connection errors from the driver
    pub async fn init(config: OrmConfig, registry: EntityRegistry) -> Result<Self> {
        if registry.is_empty() {
            return Err(DbError::InvalidConfig(
                "at least one entity must be registered".to_owned(),
            ));
        }

        let flags = config.debug.flags();
        let dsn = config.resolve_dsn()?;
        let mut handle = DbHandle::connect(&dsn, config.connect_opts()).await?;
        handle.set_statement_logger(flags);

        if flags.contains(DebugFlag::Info) {
            tracing::info!(
                engine = ?handle.engine(),
                dsn = %redact_credentials_in_dsn(handle.dsn()),
                allow_global_context = config.allow_global_context,
                "ORM connected"
            );
        }
        if flags.contains(DebugFlag::Discovery) {
            for meta in registry.iter() {
                tracing::info!(
                    entity = meta.name,
                    table = %meta.table,
                    primary_key = ?meta.primary_key,
                    "entity discovered"
                );
            }
        }

        let registry = Arc::new(registry);
        let global = EntityManager::new(handle.sea(), Arc::clone(&registry));
        Ok(Self {
            handle,
            config,
            flags,
            registry,
            global,
        })
    }

    /// The shared entity manager.
    ///
    /// # Errors
    /// Returns `DbError::GlobalContextDisallowed` unless `allow_global_context` is set.
    pub fn em(&self) -> Result<&EntityManager> {
        if self.config.allow_global_context {
            Ok(&self.global)
        } else {
            Err(DbError::GlobalContextDisallowed)
        }
    }

    /// A new entity manager with its own, empty unit of work.
    #[must_use]
    pub fn fork(&self) -> EntityManager {
        EntityManager::new(self.handle.sea(), Arc::clone(&self.registry))
    }

    /// Schema operations driven by migrator `M`.
    #[must_use]
    pub fn schema<M: MigratorTrait>(&self) -> SchemaManager<'_, M> {
        SchemaManager {
            orm: self,
            _migrator: PhantomData,
        }
    }

    #[must_use]
    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    #[must_use]
    pub fn handle(&self) -> &DbHandle {
        &self.handle
    }

    pub async fn is_connected(&self) -> bool {
        self.handle.sea().ping().await.is_ok()
    }

    /// Close the connection pool.
    ///
    /// Without `force`, unflushed changes in the global unit of work abort the
    /// close and the instance stays usable, so the caller can flush and retry.
    ///
    /// # Errors
    /// Returns `DbError::PendingChanges` when changes are pending and `force` is false.
    pub async fn close(&self, force: bool) -> Result<()> {
        let pending = self.global.pending_changes();
        if pending > 0 {
            if !force {
                return Err(DbError::PendingChanges(pending));
            }
            tracing::warn!(pending, "closing ORM with unflushed changes");
            self.global.clear();
        }
        if self.flags.contains(DebugFlag::Info) {
            tracing::info!(dsn = %redact_credentials_in_dsn(self.handle.dsn()), "ORM closing");
        }
        self.handle.close().await;
        Ok(())
    }
}

/// Schema bootstrap through a `sea-orm-migration` migrator.
pub struct SchemaManager<'a, M> {
    orm: &'a Orm,
    _migrator: PhantomData<M>,
}

impl<M: MigratorTrait> SchemaManager<'_, M> {
    /// Apply pending migrations, then verify every entity has its table.
    ///
    /// # Errors
    /// Migration failures, or `DbError::SchemaMismatch`.
    pub async fn create_schema(&self) -> Result<()> {
        self.log("applying pending migrations");
        M::up(&self.orm.handle.sea(), None).await?;
        self.ensure_entities().await
    }

    /// Roll back every applied migration.
    ///
    /// # Errors
    /// Returns an error if a migration's `down` fails.
    pub async fn drop_schema(&self) -> Result<()> {
        self.log("rolling back all migrations");
        M::down(&self.orm.handle.sea(), None).await?;
        Ok(())
    }

    /// Drop every table and re-apply all migrations from scratch.
    ///
    /// # Errors
    /// Migration failures, or `DbError::SchemaMismatch`.
    pub async fn refresh_database(&self) -> Result<()> {
        self.log("refreshing database");
        M::fresh(&self.orm.handle.sea()).await?;
        self.ensure_entities().await
    }

    /// Check that each registered entity's table exists.
    ///
    /// # Errors
    /// Returns `DbError::SchemaMismatch` for the first missing table.
    pub async fn ensure_entities(&self) -> Result<()> {
        let conn = self.orm.handle.sea();
        let manager = sea_orm_migration::SchemaManager::new(&conn);
        for meta in self.orm.registry.iter() {
            if !manager.has_table(&meta.table).await? {
                return Err(DbError::SchemaMismatch {
                    entity: meta.name,
                    table: meta.table.clone(),
                });
            }
        }
        Ok(())
    }

    fn log(&self, action: &str) {
        if self.orm.flags.contains(DebugFlag::Schema) {
            tracing::info!(
                migrations = M::migrations().len(),
                tables = ?self.orm.registry.tables(),
                "{action}"
            );
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::DebugSetting;
    use crate::metadata::test_entities::{DDL, child, parent};
    use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
    use sea_orm_migration::{MigrationName, MigrationTrait};
    use tracing_test::traced_test;
    use uuid::Uuid;

    struct CreateTables;

    impl MigrationName for CreateTables {
        fn name(&self) -> &str {
            "m0001_create_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for CreateTables {
        async fn up(
            &self,
            manager: &sea_orm_migration::SchemaManager,
        ) -> std::result::Result<(), DbErr> {
            manager.get_connection().execute_unprepared(DDL).await?;
            Ok(())
        }

        async fn down(
            &self,
            manager: &sea_orm_migration::SchemaManager,
        ) -> std::result::Result<(), DbErr> {
            manager
                .get_connection()
                .execute_unprepared("DROP TABLE children; DROP TABLE parents;")
                .await?;
            Ok(())
        }
    }

    struct TestMigrator;

    impl MigratorTrait for TestMigrator {
        fn migrations() -> Vec<Box<dyn MigrationTrait>> {
            vec![Box::new(CreateTables)]
        }
    }

    struct EmptyMigrator;

    impl MigratorTrait for EmptyMigrator {
        fn migrations() -> Vec<Box<dyn MigrationTrait>> {
            vec![]
        }
    }

    fn registry() -> EntityRegistry {
        EntityRegistry::new()
            .register::<parent::Entity>()
            .register::<child::Entity>()
    }

    fn global_config() -> OrmConfig {
        OrmConfig {
            db_name: Some(":memory:".to_owned()),
            allow_global_context: true,
            ..OrmConfig::default()
        }
    }

    fn parent_am(name: &str) -> parent::ActiveModel {
        parent::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(Uuid::new_v4()),
            name: Set(name.to_owned()),
        }
    }

    #[tokio::test]
    async fn init_requires_entities() {
        let err = Orm::init(global_config(), EntityRegistry::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn global_context_is_opt_in() {
        let orm = Orm::init(OrmConfig::default(), registry()).await.unwrap();
        assert!(matches!(orm.em(), Err(DbError::GlobalContextDisallowed)));
        assert_eq!(orm.fork().pending_changes(), 0);
        orm.close(false).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_database_recreates_schema() {
        let orm = Orm::init(global_config(), registry()).await.unwrap();
        assert!(orm.is_connected().await);

        orm.schema::<TestMigrator>().refresh_database().await.unwrap();
        let em = orm.em().unwrap();
        em.create(parent_am("before refresh")).unwrap();
        em.flush().await.unwrap();

        orm.schema::<TestMigrator>().refresh_database().await.unwrap();
        let rows = em.find::<parent::Entity>(sea_orm::Condition::all()).await.unwrap();
        assert!(rows.is_empty());
        orm.close(false).await.unwrap();
    }

    #[tokio::test]
    async fn drop_schema_removes_tables() {
        let orm = Orm::init(global_config(), registry()).await.unwrap();
        let schema = orm.schema::<TestMigrator>();
        schema.create_schema().await.unwrap();
        schema.drop_schema().await.unwrap();

        let err = schema.ensure_entities().await.unwrap_err();
        assert!(matches!(err, DbError::SchemaMismatch { ref table, .. } if table == "parents"));
    }

    #[tokio::test]
    async fn missing_tables_are_a_schema_mismatch() {
        let orm = Orm::init(global_config(), registry()).await.unwrap();
        let err = orm
            .schema::<EmptyMigrator>()
            .create_schema()
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn forks_have_independent_units_of_work() {
        let orm = Orm::init(global_config(), registry()).await.unwrap();
        orm.schema::<TestMigrator>().create_schema().await.unwrap();

        let fork = orm.fork();
        fork.create(parent_am("forked")).unwrap();
        assert_eq!(fork.pending_changes(), 1);
        assert_eq!(orm.em().unwrap().pending_changes(), 0);
        assert_eq!(fork.flush().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn close_refuses_pending_changes_unless_forced() {
        let orm = Orm::init(global_config(), registry()).await.unwrap();
        orm.em().unwrap().persist(parent_am("unsaved")).unwrap();

        let orm_again = Orm::init(global_config(), registry()).await.unwrap();
        orm_again.em().unwrap().persist(parent_am("unsaved")).unwrap();

        assert!(matches!(orm.close(false).await, Err(DbError::PendingChanges(1))));
        orm_again.close(true).await.unwrap();
        assert!(!orm_again.is_connected().await);
    }

    #[tokio::test]
    async fn refused_close_keeps_the_orm_usable() {
        let orm = Orm::init(global_config(), registry()).await.unwrap();
        orm.schema::<TestMigrator>().create_schema().await.unwrap();
        let em = orm.em().unwrap();
        em.create(parent_am("pending at close")).unwrap();

        assert!(matches!(orm.close(false).await, Err(DbError::PendingChanges(1))));
        assert!(orm.is_connected().await);

        assert_eq!(em.flush().await.unwrap(), 1);
        let stored = em
            .find::<parent::Entity>(sea_orm::Condition::all())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        orm.close(false).await.unwrap();
        assert!(!orm.is_connected().await);
    }

    #[tokio::test]
    #[traced_test]
    async fn debug_namespaces_log_queries_and_discovery() {
        let config = OrmConfig {
            debug: DebugSetting::Namespaces(vec![
                DebugFlag::Query,
                DebugFlag::QueryParams,
                DebugFlag::Discovery,
            ]),
            ..global_config()
        };
        let orm = Orm::init(config, registry()).await.unwrap();
        assert!(logs_contain("entity discovered"));

        orm.schema::<TestMigrator>().create_schema().await.unwrap();
        let em = orm.em().unwrap();
        em.create(parent_am("Tenant 1")).unwrap();
        em.flush().await.unwrap();

        assert!(logs_contain("INSERT INTO"));
        assert!(logs_contain("Tenant 1"));
    }
}
