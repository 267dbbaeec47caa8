#![allow(clippy::unwrap_used, clippy::expect_used)]

mod support;

use access_roles::infra::storage::entity::{auth_role, auth_user_role, tenant, user_profile};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelBehavior, ColumnTrait, Condition, EntityTrait, Order, QueryFilter};
use support::init_orm;
use tenant_db::secure::{AccessScope, SecureEntityExt};
use tenant_db::{DbError, EntityManager};

async fn seed_tenant(em: &EntityManager, name: &str) -> (tenant::Model, user_profile::Model, auth_role::Model) {
    let tenant = em
        .create(tenant::ActiveModel {
            name: Set(name.to_owned()),
            ..ActiveModelBehavior::new()
        })
        .unwrap();
    let profile = em
        .create(user_profile::ActiveModel {
            tenant_id: Set(tenant.id),
            name: Set(format!("{name} user")),
            ..ActiveModelBehavior::new()
        })
        .unwrap();
    let role = em
        .create(auth_role::ActiveModel {
            tenant_id: Set(tenant.id),
            name: Set(format!("{name} admin")),
            ..ActiveModelBehavior::new()
        })
        .unwrap();
    em.flush().await.unwrap();
    (tenant, profile, role)
}

#[tokio::test]
async fn cross_tenant_assignment_is_rejected_by_the_schema() {
    let orm = init_orm().await;
    let em = orm.fork();
    let (_, profile, _) = seed_tenant(&em, "Tenant A").await;
    let (_, _, foreign_role) = seed_tenant(&em, "Tenant B").await;

    em.create(auth_user_role::ActiveModel::assign(&profile, &foreign_role))
        .unwrap();
    let err = em.flush().await.unwrap_err();
    assert!(matches!(err, DbError::Flush { ref table, .. } if table == "auth_user_roles"));
    assert_eq!(em.pending_changes(), 0);

    let roles = em
        .populate::<user_profile::Entity, auth_role::Entity>(&profile)
        .await
        .unwrap();
    assert!(roles.is_empty());
}

#[tokio::test]
async fn duplicate_assignment_violates_the_pivot_key() {
    let orm = init_orm().await;
    let em = orm.fork();
    let (_, profile, role) = seed_tenant(&em, "Tenant A").await;

    em.create(auth_user_role::ActiveModel::assign(&profile, &role))
        .unwrap();
    em.flush().await.unwrap();

    em.create(auth_user_role::ActiveModel::assign(&profile, &role))
        .unwrap();
    assert!(matches!(em.flush().await, Err(DbError::Flush { .. })));
}

#[tokio::test]
async fn failed_flush_rolls_back_the_whole_batch() {
    let orm = init_orm().await;
    let em = orm.fork();
    let (tenant, profile, _) = seed_tenant(&em, "Tenant A").await;
    let (_, _, foreign_role) = seed_tenant(&em, "Tenant B").await;

    em.create(auth_role::ActiveModel {
        tenant_id: Set(tenant.id),
        name: Set("Editor".to_owned()),
        ..ActiveModelBehavior::new()
    })
    .unwrap();
    em.create(auth_user_role::ActiveModel::assign(&profile, &foreign_role))
        .unwrap();
    assert!(em.flush().await.is_err());

    let editors = em
        .find::<auth_role::Entity>(Condition::all().add(auth_role::Column::Name.eq("Editor")))
        .await
        .unwrap();
    assert!(editors.is_empty());
}

#[tokio::test]
async fn scoped_lookups_stay_within_the_tenant() {
    let orm = init_orm().await;
    let em = orm.fork();
    let (tenant_a, profile_a, _) = seed_tenant(&em, "Tenant A").await;
    let (tenant_b, _, _) = seed_tenant(&em, "Tenant B").await;

    let visible = em
        .find_scoped::<user_profile::Entity>(&AccessScope::tenant(tenant_a.id), Condition::all())
        .await
        .unwrap();
    assert_eq!(visible, vec![profile_a.clone()]);

    let hidden = em
        .find_scoped::<user_profile::Entity>(
            &AccessScope::tenant(tenant_b.id),
            Condition::all().add(user_profile::Column::Name.eq(profile_a.name.as_str())),
        )
        .await
        .unwrap();
    assert!(hidden.is_empty());

    let nothing = em
        .find_scoped::<auth_role::Entity>(&AccessScope::default(), Condition::all())
        .await
        .unwrap();
    assert!(nothing.is_empty());

    let both = em
        .find_scoped::<tenant::Entity>(
            &AccessScope::tenants_only(vec![tenant_a.id, tenant_b.id]),
            Condition::all(),
        )
        .await
        .unwrap();
    assert_eq!(both.len(), 2);
}

#[tokio::test]
async fn inverse_side_lists_role_holders() {
    let orm = init_orm().await;
    let em = orm.fork();
    let (tenant, profile, role) = seed_tenant(&em, "Tenant A").await;
    let other = em
        .create(user_profile::ActiveModel {
            tenant_id: Set(tenant.id),
            name: Set("Second user".to_owned()),
            ..ActiveModelBehavior::new()
        })
        .unwrap();
    em.flush().await.unwrap();

    em.create(auth_user_role::ActiveModel::assign(&profile, &role))
        .unwrap();
    em.create(auth_user_role::ActiveModel::assign(&other, &role))
        .unwrap();
    em.flush().await.unwrap();

    let mut holders = em
        .populate::<auth_role::Entity, user_profile::Entity>(&role)
        .await
        .unwrap();
    holders.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(holders, vec![other, profile]);
}

#[tokio::test]
async fn secure_select_keeps_the_scope_through_the_raw_query() {
    let orm = init_orm().await;
    let em = orm.fork();
    let (tenant_a, profile_a, _) = seed_tenant(&em, "Tenant A").await;
    let (_, profile_b, _) = seed_tenant(&em, "Tenant B").await;
    let scope = AccessScope::tenant(tenant_a.id);

    let first = user_profile::Entity::find()
        .secure()
        .scope_with(&scope)
        .order_by(user_profile::Column::Name, Order::Desc)
        .one(em.conn())
        .await
        .unwrap();
    assert_eq!(first, Some(profile_a.clone()));

    // Further filtering on the raw select cannot widen the scope.
    let raw = user_profile::Entity::find()
        .secure()
        .scope_with(&scope)
        .into_inner()
        .filter(user_profile::Column::Id.is_in([profile_a.id, profile_b.id]))
        .all(em.conn())
        .await
        .unwrap();
    assert_eq!(raw, vec![profile_a]);

    let count = em
        .count_scoped::<user_profile::Entity>(&AccessScope::resource(profile_b.id), Condition::all())
        .await
        .unwrap();
    assert_eq!(count, 1);
}
