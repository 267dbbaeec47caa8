//! Role directory: tenants, profiles, roles and their assignments.

use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelBehavior, ColumnTrait, Condition, EntityTrait, Order};
use tenant_db::secure::{AccessScope, SecureEntityExt};
use tenant_db::{DbError, EntityManager};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::infra::storage::entity::{auth_role, auth_user_role, tenant, user_profile};

const MAX_NAME_LEN: usize = 255;

/// A profile with its assigned roles, ordered by role name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileWithRoles {
    pub profile: user_profile::Model,
    pub roles: Vec<auth_role::Model>,
}

/// Role directory service.
///
/// Every write is flushed before the call returns, so the returned models are
/// persisted rows.
#[derive(Clone, Debug)]
pub struct RoleDirectory {
    em: EntityManager,
}

impl RoleDirectory {
    #[must_use]
    pub fn new(em: EntityManager) -> Self {
        Self { em }
    }

    #[must_use]
    pub fn entity_manager(&self) -> &EntityManager {
        &self.em
    }

    /// # Errors
    /// `DomainError::Validation` for a bad name, `DomainError::Database` on write failure.
    pub async fn create_tenant(&self, name: &str) -> Result<tenant::Model, DomainError> {
        validate_name("tenant.name", name)?;
        let tenant = self.em.create(tenant::ActiveModel {
            name: Set(name.to_owned()),
            ..ActiveModelBehavior::new()
        })?;
        self.em.flush().await?;
        info!(tenant_id = %tenant.id, "tenant created");
        Ok(tenant)
    }

    /// # Errors
    /// `DomainError::Validation` for a bad name, `DomainError::Database` on write failure.
    pub async fn create_user_profile(
        &self,
        tenant: &tenant::Model,
        name: &str,
    ) -> Result<user_profile::Model, DomainError> {
        validate_name("user_profile.name", name)?;
        let profile = self.em.create(user_profile::ActiveModel {
            tenant_id: Set(tenant.id),
            name: Set(name.to_owned()),
            ..ActiveModelBehavior::new()
        })?;
        self.em.flush().await?;
        debug!(tenant_id = %tenant.id, profile_id = %profile.id, "user profile created");
        Ok(profile)
    }

    /// # Errors
    /// `DomainError::Validation` for a bad name, `DomainError::Database` on write failure.
    pub async fn create_role(
        &self,
        tenant: &tenant::Model,
        name: &str,
    ) -> Result<auth_role::Model, DomainError> {
        validate_name("auth_role.name", name)?;
        let role = self.em.create(auth_role::ActiveModel {
            tenant_id: Set(tenant.id),
            name: Set(name.to_owned()),
            ..ActiveModelBehavior::new()
        })?;
        self.em.flush().await?;
        debug!(tenant_id = %tenant.id, role_id = %role.id, "role created");
        Ok(role)
    }

    /// Assign `role` to `profile`.
    ///
    /// # Errors
    /// - `DomainError::CrossTenantAssignment` if the two belong to different
    ///   tenants; nothing is queued in that case
    /// - `DomainError::Database` if the row is rejected, e.g. a duplicate
    pub async fn assign_role(
        &self,
        profile: &user_profile::Model,
        role: &auth_role::Model,
    ) -> Result<auth_user_role::Model, DomainError> {
        if profile.tenant_id != role.tenant_id {
            return Err(DomainError::CrossTenantAssignment {
                role_id: role.id,
                role_tenant: role.tenant_id,
                profile_tenant: profile.tenant_id,
            });
        }
        let assignment = self
            .em
            .create(auth_user_role::ActiveModel::assign(profile, role))?;
        self.em.flush().await?;
        info!(
            tenant_id = %profile.tenant_id,
            profile_id = %profile.id,
            role_id = %role.id,
            "role assigned"
        );
        Ok(assignment)
    }

    /// Role `id`, if visible within `scope`.
    ///
    /// # Errors
    /// `DomainError::RoleNotFound` when the role does not exist or lies outside `scope`.
    pub async fn role(&self, scope: &AccessScope, id: Uuid) -> Result<auth_role::Model, DomainError> {
        self.em
            .find_scoped_by_id::<auth_role::Entity>(scope, id)
            .await?
            .ok_or_else(|| DomainError::role_not_found(id))
    }

    /// Roles visible within `scope`, ordered by name.
    ///
    /// # Errors
    /// `DomainError::Database` if the query fails.
    pub async fn roles(&self, scope: &AccessScope) -> Result<Vec<auth_role::Model>, DomainError> {
        let roles = auth_role::Entity::find()
            .secure()
            .scope_with(scope)
            .order_by(auth_role::Column::Name, Order::Asc)
            .all(self.em.conn())
            .await
            .map_err(DbError::from)?;
        Ok(roles)
    }

    /// Look up a profile by name within `scope` and load its roles.
    ///
    /// # Errors
    /// `DomainError::ProfileNotFound` when no visible profile has that name.
    pub async fn profile_with_roles(
        &self,
        scope: &AccessScope,
        name: &str,
    ) -> Result<ProfileWithRoles, DomainError> {
        let profile = self
            .em
            .find_scoped::<user_profile::Entity>(
                scope,
                Condition::all().add(user_profile::Column::Name.eq(name)),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::profile_not_found(name))?;

        let mut roles = self
            .em
            .populate::<user_profile::Entity, auth_role::Entity>(&profile)
            .await?;
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ProfileWithRoles { profile, roles })
    }

    /// Profile named `name` anywhere, with roles loaded.
    ///
    /// # Errors
    /// `DomainError::ProfileNotFound` when no profile has that name.
    pub async fn profile_with_roles_unscoped(
        &self,
        name: &str,
    ) -> Result<ProfileWithRoles, DomainError> {
        let loaded = self
            .em
            .find_one_or_fail_populated::<user_profile::Entity, auth_role::Entity>(
                Condition::all().add(user_profile::Column::Name.eq(name)),
            )
            .await
            .map_err(|e| match e {
                DbError::NotFound { .. } => DomainError::profile_not_found(name),
                other => other.into(),
            })?;
        let mut roles = loaded.related;
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ProfileWithRoles {
            profile: loaded.entity,
            roles,
        })
    }

    /// Profiles holding `role`, ordered by name.
    ///
    /// # Errors
    /// `DomainError::Database` if the query fails.
    pub async fn profiles_with_role(
        &self,
        role: &auth_role::Model,
    ) -> Result<Vec<user_profile::Model>, DomainError> {
        let mut profiles = self
            .em
            .populate::<auth_role::Entity, user_profile::Entity>(role)
            .await?;
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }
}

fn validate_name(field: &str, name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation(field, "cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(DomainError::validation(
            field,
            format!("too long: {} characters (max: {MAX_NAME_LEN})", name.len()),
        ));
    }
    Ok(())
}
