use sea_orm::EntityTrait;

/// Declares which columns carry the tenant and the resource identity of an entity.
///
/// Both dimensions are explicit; `None` means the entity cannot be filtered
/// on that dimension and a scope that requires it denies every row.
///
/// ```rust,ignore
/// impl ScopableEntity for user_profile::Entity {
///     fn tenant_col() -> Option<Self::Column> {
///         Some(user_profile::Column::TenantId)
///     }
///     fn resource_col() -> Option<Self::Column> {
///         Some(user_profile::Column::Id)
///     }
/// }
/// ```
pub trait ScopableEntity: EntityTrait {
    /// Column holding the tenant id. The tenant root itself returns its primary key.
    fn tenant_col() -> Option<Self::Column>;

    /// Column holding the resource id, typically the primary key.
    fn resource_col() -> Option<Self::Column>;
}
