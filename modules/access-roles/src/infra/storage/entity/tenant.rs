use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use tenant_db::secure::ScopableEntity;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::auth_role::Entity")]
    AuthRoles,
    #[sea_orm(has_many = "super::user_profile::Entity")]
    UserProfiles,
}

impl Related<super::auth_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthRoles.def()
    }
}

impl Related<super::user_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserProfiles.def()
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

// A tenant is its own tenant.
impl ScopableEntity for Entity {
    fn tenant_col() -> Option<Column> {
        Some(Column::Id)
    }
    fn resource_col() -> Option<Column> {
        Some(Column::Id)
    }
}
