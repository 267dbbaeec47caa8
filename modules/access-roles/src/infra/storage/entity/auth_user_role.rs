use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use tenant_db::secure::ScopableEntity;
use time::OffsetDateTime;

/// Assignment of a role to a user profile.
///
/// `tenant_id` takes part in both composite foreign keys, so the profile and
/// the role must belong to the same tenant as the assignment itself.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_user_roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_profile_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub role_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user_profile::Entity",
        from = "(Column::UserProfileId, Column::TenantId)",
        to = "(super::user_profile::Column::Id, super::user_profile::Column::TenantId)",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    UserProfile,
    #[sea_orm(
        belongs_to = "super::auth_role::Entity",
        from = "(Column::RoleId, Column::TenantId)",
        to = "(super::auth_role::Column::Id, super::auth_role::Column::TenantId)",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Role,
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Tenant,
}

impl Related<super::user_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserProfile.def()
    }
}

impl Related<super::auth_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            created_at: Set(OffsetDateTime::now_utc()),
            ..ActiveModelTrait::default()
        }
    }
}

impl ActiveModel {
    /// Assignment of `role` to `profile`, stamped with the current time.
    ///
    /// The tenant is taken from the profile; a role from another tenant makes
    /// the row violate the role foreign key.
    #[must_use]
    pub fn assign(profile: &super::user_profile::Model, role: &super::auth_role::Model) -> Self {
        Self {
            user_profile_id: Set(profile.id),
            role_id: Set(role.id),
            tenant_id: Set(profile.tenant_id),
            ..<Self as ActiveModelBehavior>::new()
        }
    }
}

impl ScopableEntity for Entity {
    fn tenant_col() -> Option<Column> {
        Some(Column::TenantId)
    }
    fn resource_col() -> Option<Column> {
        None
    }
}
