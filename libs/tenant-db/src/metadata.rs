//! Entity discovery metadata.

use std::any::TypeId;

use sea_orm::{EntityTrait, IdenStatic, Iterable, PrimaryKeyToColumn};

/// Metadata captured for one registered entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityMeta {
    type_id: TypeId,
    /// Rust type name of the `SeaORM` entity.
    pub name: &'static str,
    pub table: String,
    pub primary_key: Vec<String>,
}

/// Ordered list of entities an [`crate::Orm`] manages.
///
/// Registration order doubles as commit order during flush: register parents
/// (tenants) before the rows that reference them (pivot tables last).
#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    entities: Vec<EntityMeta>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `E`. Registering the same entity twice keeps the first position.
    #[must_use]
    pub fn register<E>(mut self) -> Self
    where
        E: EntityTrait,
    {
        if self.position_of(TypeId::of::<E>()).is_none() {
            self.entities.push(EntityMeta {
                type_id: TypeId::of::<E>(),
                name: std::any::type_name::<E>(),
                table: E::default().table_name().to_owned(),
                primary_key: E::PrimaryKey::iter()
                    .map(|pk| pk.into_column().as_str().to_owned())
                    .collect(),
            });
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityMeta> {
        self.entities.iter()
    }

    #[must_use]
    pub fn position<E: EntityTrait>(&self) -> Option<usize> {
        self.position_of(TypeId::of::<E>())
    }

    #[must_use]
    pub fn get<E: EntityTrait>(&self) -> Option<&EntityMeta> {
        self.position::<E>().map(|i| &self.entities[i])
    }

    /// Table names in registration order.
    #[must_use]
    pub fn tables(&self) -> Vec<&str> {
        self.entities.iter().map(|m| m.table.as_str()).collect()
    }

    pub(crate) fn position_of(&self, type_id: TypeId) -> Option<usize> {
        self.entities.iter().position(|m| m.type_id == type_id)
    }
}
