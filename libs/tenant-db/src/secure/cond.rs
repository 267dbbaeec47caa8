use sea_orm::{ColumnTrait, Condition, sea_query::Expr};

use crate::secure::{AccessScope, ScopableEntity};

/// Build the filter implied by `scope` for entity `E`.
///
/// 1. Empty scope → deny all
/// 2. Tenants → `tenant_col IN (..)`; no tenant column → deny all
/// 3. Resources → `resource_col IN (..)`; no resource column → deny all
/// 4. Both → AND
#[must_use]
pub fn build_scope_condition<E>(scope: &AccessScope) -> Condition
where
    E: ScopableEntity,
    E::Column: ColumnTrait + Copy,
{
    let deny_all = || Condition::all().add(Expr::value(false));

    if scope.is_empty() {
        return deny_all();
    }

    let mut cond = Condition::all();

    if scope.has_tenants() {
        let Some(tenant_col) = E::tenant_col() else {
            return deny_all();
        };
        cond = cond.add(tenant_col.is_in(scope.tenant_ids().to_vec()));
    }

    if scope.has_resources() {
        let Some(resource_col) = E::resource_col() else {
            return deny_all();
        };
        cond = cond.add(resource_col.is_in(scope.resource_ids().to_vec()));
    }

    cond
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::test_entities::parent;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};
    use uuid::Uuid;

    fn sql(scope: &AccessScope) -> String {
        parent::Entity::find()
            .filter(build_scope_condition::<parent::Entity>(scope))
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn empty_scope_denies_all() {
        assert!(sql(&AccessScope::default()).contains("WHERE FALSE"));
    }

    #[test]
    fn tenant_scope_filters_tenant_column() {
        let s = sql(&AccessScope::tenant(Uuid::nil()));
        assert!(s.contains(r#""parents"."tenant_id" IN"#));
        assert!(!s.contains(r#""parents"."id" IN"#));
    }

    #[test]
    fn both_dimensions_are_anded() {
        let s = sql(&AccessScope::both(vec![Uuid::nil()], vec![Uuid::new_v4()]));
        assert!(s.contains(r#""parents"."tenant_id" IN"#));
        assert!(s.contains(" AND "));
        assert!(s.contains(r#""parents"."id" IN"#));
    }
}
