use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use tenant_db::secure::ScopableEntity;

/// A user within one tenant. The key is `(id, tenant_id)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: Uuid,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Tenant,
    #[sea_orm(has_many = "super::auth_user_role::Entity")]
    Assignments,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::auth_user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

/// Roles assigned to the profile, through `auth_user_roles`.
impl Related<super::auth_role::Entity> for Entity {
    fn to() -> RelationDef {
        super::auth_user_role::Relation::Role.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::auth_user_role::Relation::UserProfile.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            id: Set(Uuid::new_v4()),
            ..ActiveModelTrait::default()
        }
    }
}

impl ScopableEntity for Entity {
    fn tenant_col() -> Option<Column> {
        Some(Column::TenantId)
    }
    fn resource_col() -> Option<Column> {
        Some(Column::Id)
    }
}
