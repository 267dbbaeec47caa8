//! Multi-tenant role mapping.
//!
//! Tenants own roles and user profiles; the `auth_user_roles` pivot assigns
//! roles to profiles. Every non-tenant key carries the tenant id and the pivot
//! shares one `tenant_id` column between both composite foreign keys, so a
//! role can only ever be assigned within its own tenant.
//!
//! ```rust,no_run
//! use access_roles::infra::storage::{entities, migrations::Migrator};
//! use tenant_db::{Orm, OrmConfig};
//!
//! # async fn run() -> tenant_db::Result<()> {
//! let orm = Orm::init(OrmConfig::default(), entities()).await?;
//! orm.schema::<Migrator>().refresh_database().await?;
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod infra;
