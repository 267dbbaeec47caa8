use std::marker::PhantomData;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use crate::secure::cond::build_scope_condition;
use crate::secure::error::ScopeError;
use crate::secure::{AccessScope, ScopableEntity};

/// Typestate marker: no scope applied yet, the query cannot run.
#[derive(Debug, Clone, Copy)]
pub struct Unscoped;

/// Typestate marker: scope applied, the query can run.
#[derive(Debug, Clone, Copy)]
pub struct Scoped;

/// `SeaORM` `Select` that must be scoped before it executes.
///
/// ```rust,ignore
/// let roles = auth_role::Entity::find()
///     .secure()
///     .scope_with(&AccessScope::tenant(tenant_id))
///     .all(conn)
///     .await?;
/// ```
#[must_use]
#[derive(Clone, Debug)]
pub struct SecureSelect<E: EntityTrait, S> {
    inner: sea_orm::Select<E>,
    _state: PhantomData<S>,
}

/// Converts a `Select` into an unscoped [`SecureSelect`].
pub trait SecureEntityExt<E: EntityTrait>: Sized {
    fn secure(self) -> SecureSelect<E, Unscoped>;
}

impl<E> SecureEntityExt<E> for sea_orm::Select<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureSelect<E, Unscoped> {
        SecureSelect {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Unscoped>
where
    E: ScopableEntity,
    E::Column: ColumnTrait + Copy,
{
    /// Apply `scope`, moving the query into the `Scoped` state.
    pub fn scope_with(self, scope: &AccessScope) -> SecureSelect<E, Scoped> {
        SecureSelect {
            inner: self.inner.filter(build_scope_condition::<E>(scope)),
            _state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Scoped>
where
    E: EntityTrait,
{
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn all<C>(self, conn: &C) -> Result<Vec<E::Model>, ScopeError>
    where
        C: ConnectionTrait,
    {
        Ok(self.inner.all(conn).await?)
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn one<C>(self, conn: &C) -> Result<Option<E::Model>, ScopeError>
    where
        C: ConnectionTrait,
    {
        Ok(self.inner.one(conn).await?)
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn count<C>(self, conn: &C) -> Result<u64, ScopeError>
    where
        C: ConnectionTrait,
        E::Model: sea_orm::FromQueryResult + Send + Sync,
    {
        Ok(self.inner.count(conn).await?)
    }

    /// Narrow to a single resource id.
    ///
    /// # Errors
    /// Returns `ScopeError::Invalid` if the entity has no resource column.
    pub fn and_id(self, id: uuid::Uuid) -> Result<Self, ScopeError>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
    {
        let resource_col = E::resource_col().ok_or(ScopeError::Invalid(
            "entity must have a resource_col to use and_id()",
        ))?;
        Ok(self.filter(sea_orm::Condition::all().add(resource_col.eq(id))))
    }

    /// Additional filters; the scope condition stays in place.
    pub fn filter(mut self, filter: sea_orm::Condition) -> Self {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    pub fn order_by<C>(mut self, col: C, order: sea_orm::Order) -> Self
    where
        C: sea_orm::IntoSimpleExpr,
    {
        self.inner = QueryOrder::order_by(self.inner, col, order);
        self
    }

    /// Escape hatch to the underlying `Select`. Callers must keep the scope filter intact.
    #[must_use]
    pub fn into_inner(self) -> sea_orm::Select<E> {
        self.inner
    }
}
