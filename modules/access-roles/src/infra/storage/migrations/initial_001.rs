use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let conn = manager.get_connection();

        let statements: &[&str] = match backend {
            sea_orm::DatabaseBackend::Postgres => &[
                r"
CREATE TABLE IF NOT EXISTS tenants (
    id UUID PRIMARY KEY NOT NULL,
    name VARCHAR(255) NOT NULL
)",
                r"
CREATE TABLE IF NOT EXISTS auth_roles (
    id UUID NOT NULL,
    tenant_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    PRIMARY KEY (id, tenant_id),
    CONSTRAINT fk_auth_roles_tenant FOREIGN KEY (tenant_id)
        REFERENCES tenants(id) ON UPDATE NO ACTION ON DELETE NO ACTION
)",
                r"
CREATE TABLE IF NOT EXISTS user_profiles (
    id UUID NOT NULL,
    tenant_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    PRIMARY KEY (id, tenant_id),
    CONSTRAINT fk_user_profiles_tenant FOREIGN KEY (tenant_id)
        REFERENCES tenants(id) ON UPDATE NO ACTION ON DELETE NO ACTION
)",
                r"
CREATE TABLE IF NOT EXISTS auth_user_roles (
    user_profile_id UUID NOT NULL,
    role_id UUID NOT NULL,
    tenant_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_profile_id, role_id, tenant_id),
    CONSTRAINT fk_auth_user_roles_profile FOREIGN KEY (user_profile_id, tenant_id)
        REFERENCES user_profiles(id, tenant_id) ON UPDATE NO ACTION ON DELETE NO ACTION,
    CONSTRAINT fk_auth_user_roles_role FOREIGN KEY (role_id, tenant_id)
        REFERENCES auth_roles(id, tenant_id) ON UPDATE NO ACTION ON DELETE NO ACTION,
    CONSTRAINT fk_auth_user_roles_tenant FOREIGN KEY (tenant_id)
        REFERENCES tenants(id) ON UPDATE NO ACTION ON DELETE NO ACTION
)",
                "CREATE INDEX IF NOT EXISTS idx_auth_user_roles_role ON auth_user_roles(role_id, tenant_id)",
            ],
            sea_orm::DatabaseBackend::MySql => &[
                r"
CREATE TABLE IF NOT EXISTS tenants (
    id BINARY(16) PRIMARY KEY NOT NULL,
    name VARCHAR(255) NOT NULL
)",
                r"
CREATE TABLE IF NOT EXISTS auth_roles (
    id BINARY(16) NOT NULL,
    tenant_id BINARY(16) NOT NULL,
    name VARCHAR(255) NOT NULL,
    PRIMARY KEY (id, tenant_id),
    CONSTRAINT fk_auth_roles_tenant FOREIGN KEY (tenant_id)
        REFERENCES tenants(id) ON UPDATE NO ACTION ON DELETE NO ACTION
)",
                r"
CREATE TABLE IF NOT EXISTS user_profiles (
    id BINARY(16) NOT NULL,
    tenant_id BINARY(16) NOT NULL,
    name VARCHAR(255) NOT NULL,
    PRIMARY KEY (id, tenant_id),
    CONSTRAINT fk_user_profiles_tenant FOREIGN KEY (tenant_id)
        REFERENCES tenants(id) ON UPDATE NO ACTION ON DELETE NO ACTION
)",
                r"
CREATE TABLE IF NOT EXISTS auth_user_roles (
    user_profile_id BINARY(16) NOT NULL,
    role_id BINARY(16) NOT NULL,
    tenant_id BINARY(16) NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_profile_id, role_id, tenant_id),
    KEY idx_auth_user_roles_role (role_id, tenant_id),
    CONSTRAINT fk_auth_user_roles_profile FOREIGN KEY (user_profile_id, tenant_id)
        REFERENCES user_profiles(id, tenant_id) ON UPDATE NO ACTION ON DELETE NO ACTION,
    CONSTRAINT fk_auth_user_roles_role FOREIGN KEY (role_id, tenant_id)
        REFERENCES auth_roles(id, tenant_id) ON UPDATE NO ACTION ON DELETE NO ACTION,
    CONSTRAINT fk_auth_user_roles_tenant FOREIGN KEY (tenant_id)
        REFERENCES tenants(id) ON UPDATE NO ACTION ON DELETE NO ACTION
)",
            ],
            sea_orm::DatabaseBackend::Sqlite => &[
                r"
CREATE TABLE IF NOT EXISTS tenants (
    id BLOB PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
)",
                r"
CREATE TABLE IF NOT EXISTS auth_roles (
    id BLOB NOT NULL,
    tenant_id BLOB NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (id, tenant_id),
    FOREIGN KEY (tenant_id) REFERENCES tenants(id)
        ON UPDATE NO ACTION ON DELETE NO ACTION
)",
                r"
CREATE TABLE IF NOT EXISTS user_profiles (
    id BLOB NOT NULL,
    tenant_id BLOB NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (id, tenant_id),
    FOREIGN KEY (tenant_id) REFERENCES tenants(id)
        ON UPDATE NO ACTION ON DELETE NO ACTION
)",
                r"
CREATE TABLE IF NOT EXISTS auth_user_roles (
    user_profile_id BLOB NOT NULL,
    role_id BLOB NOT NULL,
    tenant_id BLOB NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_profile_id, role_id, tenant_id),
    FOREIGN KEY (user_profile_id, tenant_id) REFERENCES user_profiles(id, tenant_id)
        ON UPDATE NO ACTION ON DELETE NO ACTION,
    FOREIGN KEY (role_id, tenant_id) REFERENCES auth_roles(id, tenant_id)
        ON UPDATE NO ACTION ON DELETE NO ACTION,
    FOREIGN KEY (tenant_id) REFERENCES tenants(id)
        ON UPDATE NO ACTION ON DELETE NO ACTION
)",
                "CREATE INDEX IF NOT EXISTS idx_auth_user_roles_role ON auth_user_roles(role_id, tenant_id)",
            ],
        };

        for sql in statements {
            conn.execute_unprepared(sql).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        // Children first; the foreign keys would block the parents.
        for table in ["auth_user_roles", "user_profiles", "auth_roles", "tenants"] {
            conn.execute_unprepared(&format!("DROP TABLE IF EXISTS {table}"))
                .await?;
        }
        Ok(())
    }
}
