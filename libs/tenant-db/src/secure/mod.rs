//! Tenant scoping for queries.
//!
//! Entities opt in by implementing [`ScopableEntity`]; queries are wrapped in a
//! [`SecureSelect`] that cannot execute until an [`AccessScope`] is applied.
//!
//! ```rust
//! use tenant_db::secure::AccessScope;
//! use uuid::Uuid;
//!
//! let deny = AccessScope::default();
//! assert!(deny.is_empty());
//!
//! let scope = AccessScope::tenant(Uuid::new_v4());
//! assert!(scope.has_tenants());
//! ```
//!
//! | Scope | Behavior |
//! |-------|----------|
//! | Empty | Deny all (`WHERE 1=0`) |
//! | Tenants only | Filter by tenant column |
//! | Resources only | Filter by resource column |
//! | Both | AND them together |

mod access_scope;
mod cond;
mod entity_traits;
mod error;
mod select;

pub use access_scope::AccessScope;
pub use cond::build_scope_condition;
pub use entity_traits::ScopableEntity;
pub use error::ScopeError;
pub use select::{Scoped, SecureEntityExt, SecureSelect, Unscoped};
