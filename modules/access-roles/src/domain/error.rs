use tenant_db::DbError;
use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User profile not found: {name}")]
    ProfileNotFound { name: String },

    #[error("Role not found: {id}")]
    RoleNotFound { id: Uuid },

    #[error(
        "Role {role_id} of tenant {role_tenant} cannot be assigned to a profile of tenant {profile_tenant}"
    )]
    CrossTenantAssignment {
        role_id: Uuid,
        role_tenant: Uuid,
        profile_tenant: Uuid,
    },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl DomainError {
    #[must_use]
    pub fn profile_not_found(name: impl Into<String>) -> Self {
        Self::ProfileNotFound { name: name.into() }
    }

    #[must_use]
    pub fn role_not_found(id: Uuid) -> Self {
        Self::RoleNotFound { id }
    }

    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

