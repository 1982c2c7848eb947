//! Maps an inbound telephony address to the tenant that owns it.

use crate::core::shared::models::Tenant;
use crate::core::shared::utils::non_blank;
use crate::core::store::{StoreError, TenantStore};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("missing tenant selector")]
    Missing,
    #[error("no tenant registered for {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Addresses arrive in E.164 already; only surrounding whitespace is removed.
pub fn normalize_address(raw: Option<&str>) -> Option<String> {
    non_blank(raw)
}

pub async fn resolve_tenant(store: &dyn TenantStore, raw: Option<&str>) -> Result<Tenant, ResolveError> {
    let address = normalize_address(raw).ok_or(ResolveError::Missing)?;
    store
        .tenant_by_number(&address)
        .await?
        .ok_or(ResolveError::NotFound(address))
}
