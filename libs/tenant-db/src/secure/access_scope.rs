use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenants and resources a caller may read.
///
/// An empty scope (no tenants, no resources) denies everything.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessScope {
    tenant_ids: Vec<Uuid>,
    resource_ids: Vec<Uuid>,
}

impl AccessScope {
    #[inline]
    #[must_use]
    pub fn tenant_ids(&self) -> &[Uuid] {
        &self.tenant_ids
    }

    #[inline]
    #[must_use]
    pub fn resource_ids(&self) -> &[Uuid] {
        &self.resource_ids
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenant_ids.is_empty() && self.resource_ids.is_empty()
    }

    #[must_use]
    pub fn has_tenants(&self) -> bool {
        !self.tenant_ids.is_empty()
    }

    #[must_use]
    pub fn has_resources(&self) -> bool {
        !self.resource_ids.is_empty()
    }

    #[must_use]
    pub fn tenants_only(tenant_ids: Vec<Uuid>) -> Self {
        Self {
            tenant_ids,
            resource_ids: vec![],
        }
    }

    #[must_use]
    pub fn resources_only(resource_ids: Vec<Uuid>) -> Self {
        Self {
            tenant_ids: vec![],
            resource_ids,
        }
    }

    #[must_use]
    pub fn tenant(tenant_id: Uuid) -> Self {
        Self::tenants_only(vec![tenant_id])
    }

    #[must_use]
    pub fn resource(resource_id: Uuid) -> Self {
        Self::resources_only(vec![resource_id])
    }

    /// Tenant and resource constraints combined with AND.
    #[must_use]
    pub fn both(tenant_ids: Vec<Uuid>, resource_ids: Vec<Uuid>) -> Self {
        Self {
            tenant_ids,
            resource_ids,
        }
    }
}
