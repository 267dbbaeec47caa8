//! Unit of work over a `SeaORM` connection.
//!
//! Entities are registered with [`EntityManager::create`] or
//! [`EntityManager::persist`] and written only when [`EntityManager::flush`]
//! runs. A flush writes the whole queue in one transaction, ordered by the
//! entity registry so that parents land before the rows that reference them.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, FromQueryResult, IntoActiveModel, ModelTrait, QueryFilter, Related,
    TransactionTrait, TryIntoModel,
};
use uuid::Uuid;

use crate::metadata::EntityRegistry;
use crate::secure::{AccessScope, ScopableEntity, SecureEntityExt};
use crate::{DbError, Result};

type ModelOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Model;

/// An entity together with an eagerly loaded related collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Populated<M, R> {
    pub entity: M,
    pub related: Vec<R>,
}

#[async_trait]
trait PendingChange: Send {
    fn entity(&self) -> TypeId;
    fn table(&self) -> &str;
    async fn apply(self: Box<Self>, tx: &DatabaseTransaction) -> std::result::Result<(), DbErr>;
}

struct PendingInsert<A> {
    model: A,
    table: String,
}

#[async_trait]
impl<A> PendingChange for PendingInsert<A>
where
    A: ActiveModelTrait + Send + 'static,
    ModelOf<A>: IntoActiveModel<A>,
{
    fn entity(&self) -> TypeId {
        TypeId::of::<A::Entity>()
    }

    fn table(&self) -> &str {
        &self.table
    }

    async fn apply(self: Box<Self>, tx: &DatabaseTransaction) -> std::result::Result<(), DbErr> {
        <A::Entity as EntityTrait>::insert(self.model)
            .exec_without_returning(tx)
            .await?;
        Ok(())
    }
}

/// Entity manager: query API plus a unit of work.
///
/// Clones share the same unit of work; use [`crate::Orm::fork`] for an
/// independent one.
#[derive(Clone)]
pub struct EntityManager {
    conn: DatabaseConnection,
    registry: Arc<EntityRegistry>,
    pending: Arc<Mutex<Vec<Box<dyn PendingChange>>>>,
}

impl fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("entities", &self.registry.len())
            .field("pending", &self.pending_changes())
            .finish_non_exhaustive()
    }
}

impl EntityManager {
    pub(crate) fn new(conn: DatabaseConnection, registry: Arc<EntityRegistry>) -> Self {
        Self {
            conn,
            registry,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Connection used for reads and flushes.
    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Register a new entity for insertion and return it as a model.
    ///
    /// Every column must be set; use [`Self::persist`] to rely on database defaults.
    ///
    /// # Errors
    /// - `DbError::UnknownEntity` if the entity is not registered
    /// - `DbError::Sea` if a column is left unset
    pub fn create<A>(&self, model: A) -> Result<ModelOf<A>>
    where
        A: ActiveModelTrait + TryIntoModel<ModelOf<A>> + Send + 'static,
        ModelOf<A>: IntoActiveModel<A>,
    {
        let table = self.registered_table::<A::Entity>()?;
        let created = model.clone().try_into_model()?;
        self.enqueue(PendingInsert { model, table });
        Ok(created)
    }

    /// Register an insert without materializing a model; unset columns take
    /// their database defaults.
    ///
    /// # Errors
    /// Returns `DbError::UnknownEntity` if the entity is not registered.
    pub fn persist<A>(&self, model: A) -> Result<()>
    where
        A: ActiveModelTrait + Send + 'static,
        ModelOf<A>: IntoActiveModel<A>,
    {
        let table = self.registered_table::<A::Entity>()?;
        self.enqueue(PendingInsert { model, table });
        Ok(())
    }

    /// Number of changes waiting for the next flush.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drop every pending change without writing it.
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut *self.pending.lock()).len();
        if dropped > 0 {
            tracing::debug!(dropped, "unit of work cleared");
        }
    }

    /// Write all pending changes in one transaction and return how many were written.
    ///
    /// The queue is drained before writing; on failure the transaction is
    /// rolled back and the drained batch is discarded.
    ///
    /// # Errors
    /// - `DbError::Flush` naming the table whose write failed
    /// - `DbError::Sea` if the transaction cannot begin or commit
    pub async fn flush(&self) -> Result<usize> {
        let mut batch = std::mem::take(&mut *self.pending.lock());
        if batch.is_empty() {
            return Ok(0);
        }

        let registry = &self.registry;
        batch.sort_by_key(|change| registry.position_of(change.entity()).unwrap_or(usize::MAX));

        let count = batch.len();
        tracing::debug!(changes = count, "flushing unit of work");

        let tx = self.conn.begin().await?;
        for change in batch {
            let table = change.table().to_owned();
            if let Err(source) = change.apply(&tx).await {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback after failed flush failed");
                }
                tracing::warn!(table = %table, error = %source, "flush failed, transaction rolled back");
                return Err(DbError::Flush { table, source });
            }
        }
        tx.commit().await?;

        tracing::debug!(changes = count, "unit of work committed");
        Ok(count)
    }

    /// # Errors
    /// - `DbError::UnknownEntity` if `E` is not registered
    /// - `DbError::Sea` if the query fails
    pub async fn find<E: EntityTrait>(&self, filter: Condition) -> Result<Vec<E::Model>> {
        self.registered_table::<E>()?;
        Ok(E::find().filter(filter).all(&self.conn).await?)
    }

    /// # Errors
    /// - `DbError::UnknownEntity` if `E` is not registered
    /// - `DbError::Sea` if the query fails
    pub async fn find_one<E: EntityTrait>(&self, filter: Condition) -> Result<Option<E::Model>> {
        self.registered_table::<E>()?;
        Ok(E::find().filter(filter).one(&self.conn).await?)
    }

    /// Like [`Self::find_one`] but a missing row is an error.
    ///
    /// # Errors
    /// - `DbError::NotFound` if no row matches
    /// - `DbError::UnknownEntity` / `DbError::Sea` as for [`Self::find_one`]
    pub async fn find_one_or_fail<E: EntityTrait>(&self, filter: Condition) -> Result<E::Model> {
        let table = self.registered_table::<E>()?;
        E::find()
            .filter(filter)
            .one(&self.conn)
            .await?
            .ok_or(DbError::NotFound { entity: table })
    }

    /// Load the `R` collection related to `model`, through the pivot for many-to-many.
    ///
    /// # Errors
    /// - `DbError::UnknownEntity` if `R` is not registered
    /// - `DbError::Sea` if the query fails
    pub async fn populate<E, R>(&self, model: &E::Model) -> Result<Vec<R::Model>>
    where
        E: EntityTrait + Related<R>,
        R: EntityTrait,
    {
        self.registered_table::<R>()?;
        Ok(model.find_related(R::default()).all(&self.conn).await?)
    }

    /// [`Self::find_one_or_fail`] with the `R` collection eagerly populated.
    ///
    /// # Errors
    /// Same as [`Self::find_one_or_fail`] and [`Self::populate`].
    pub async fn find_one_or_fail_populated<E, R>(
        &self,
        filter: Condition,
    ) -> Result<Populated<E::Model, R::Model>>
    where
        E: EntityTrait + Related<R>,
        R: EntityTrait,
    {
        let entity = self.find_one_or_fail::<E>(filter).await?;
        let related = self.populate::<E, R>(&entity).await?;
        Ok(Populated { entity, related })
    }

    /// Rows of `E` visible within `scope` that also match `filter`.
    ///
    /// # Errors
    /// - `DbError::UnknownEntity` if `E` is not registered
    /// - `DbError::Scope` if the query fails
    pub async fn find_scoped<E>(&self, scope: &AccessScope, filter: Condition) -> Result<Vec<E::Model>>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
    {
        self.registered_table::<E>()?;
        Ok(E::find()
            .secure()
            .scope_with(scope)
            .filter(filter)
            .all(&self.conn)
            .await?)
    }

    /// Row of `E` whose resource id is `id`, if it is visible within `scope`.
    ///
    /// # Errors
    /// - `DbError::UnknownEntity` if `E` is not registered
    /// - `DbError::Scope` if `E` has no resource column or the query fails
    pub async fn find_scoped_by_id<E>(&self, scope: &AccessScope, id: Uuid) -> Result<Option<E::Model>>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
    {
        self.registered_table::<E>()?;
        Ok(E::find()
            .secure()
            .scope_with(scope)
            .and_id(id)?
            .one(&self.conn)
            .await?)
    }

    /// Number of rows of `E` visible within `scope` that match `filter`.
    ///
    /// # Errors
    /// - `DbError::UnknownEntity` if `E` is not registered
    /// - `DbError::Scope` if the query fails
    pub async fn count_scoped<E>(&self, scope: &AccessScope, filter: Condition) -> Result<u64>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
        E::Model: FromQueryResult + Send + Sync,
    {
        self.registered_table::<E>()?;
        Ok(E::find()
            .secure()
            .scope_with(scope)
            .filter(filter)
            .count(&self.conn)
            .await?)
    }

    fn registered_table<E: EntityTrait>(&self) -> Result<String> {
        self.registry
            .get::<E>()
            .map(|meta| meta.table.clone())
            .ok_or(DbError::UnknownEntity(std::any::type_name::<E>()))
    }

    fn enqueue(&self, change: impl PendingChange + 'static) {
        let table = change.table().to_owned();
        let mut pending = self.pending.lock();
        pending.push(Box::new(change));
        tracing::trace!(table = %table, pending = pending.len(), "change registered");
    }
}
