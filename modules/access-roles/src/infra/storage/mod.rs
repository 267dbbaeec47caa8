pub mod entity;
pub mod migrations;

use tenant_db::EntityRegistry;

use entity::{auth_role, auth_user_role, tenant, user_profile};

/// Entities managed by this module, parents first.
#[must_use]
pub fn entities() -> EntityRegistry {
    EntityRegistry::new()
        .register::<tenant::Entity>()
        .register::<auth_role::Entity>()
        .register::<user_profile::Entity>()
        .register::<auth_user_role::Entity>()
}
