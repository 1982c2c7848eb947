//! SMS consent ledger and the web opt-in form endpoint.
//!
//! A caller counts as opted in once any consent row exists for the
//! (tenant, caller) pair. Rows are only ever appended.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::app_api::ApiError;
use crate::core::shared::models::{ConsentOrigin, ConsentRecord, ConsentSource, EventType, NewEvent};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::non_blank;
use crate::core::store::{StoreError, TenantStore};
use crate::core::tenant::resolve_tenant;
use crate::security::ClientMeta;

/// A missing caller address never has consent.
pub async fn has_consent(
    store: &dyn TenantStore,
    tenant_id: Uuid,
    caller: Option<&str>,
) -> Result<bool, StoreError> {
    match caller {
        Some(phone) => store.has_consent(tenant_id, phone).await,
        None => Ok(false),
    }
}

pub async fn record_consent(
    store: &dyn TenantStore,
    tenant_id: Uuid,
    caller: &str,
    source: ConsentSource,
    origin: ConsentOrigin,
) -> Result<ConsentRecord, StoreError> {
    let record = store.insert_consent(tenant_id, caller, source, origin).await?;
    info!("Recorded {} opt-in for {} (tenant {})", source.as_str(), caller, tenant_id);
    Ok(record)
}

#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    pub to: Option<String>,
    pub phone: Option<String>,
    pub consent: Option<bool>,
}

pub async fn submit_consent(
    State(state): State<Arc<AppState>>,
    client: ClientMeta,
    body: Result<Json<ConsentForm>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(form) = body.map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e.body_text())))?;

    if form.consent != Some(true) {
        return Err(ApiError::BadRequest("Consent must be true".to_string()));
    }
    let to = non_blank(form.to.as_deref()).ok_or(ApiError::MissingTo)?;
    let phone = non_blank(form.phone.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Missing phone".to_string()))?;

    let tenant = resolve_tenant(state.store.as_ref(), Some(&to)).await?;
    let origin = client.into_origin();
    let ip = origin.ip.clone();

    record_consent(state.store.as_ref(), tenant.id, &phone, ConsentSource::WebForm, origin).await?;
    state
        .store
        .insert_event(NewEvent::new(
            tenant.id,
            EventType::SmsOptIn,
            json!({ "customerPhone": phone, "ip": ip }),
        ))
        .await?;

    Ok(Json(json!({ "ok": true })))
}
