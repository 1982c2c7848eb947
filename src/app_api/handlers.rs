use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use log::info;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::types::{
    analytics_days, lead_changes_from_json, lead_status_options, parse_lead_id, parse_optional_id,
    parse_optional_timestamp, AnalyticsQuery, AnalyticsResponse, AppointmentsQuery, BootstrapResponse,
    CreateAppointmentRequest, CreateNoteRequest, Kpis, LeadsQuery, TenantQuery,
};
use super::ApiError;
use crate::core::shared::models::{
    AppointmentRange, EventType, Lead, NewAppointment, NewEvent, Tenant,
};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::non_blank;
use crate::core::tenant::resolve_tenant;

const DEFAULT_APPOINTMENT_STATUS: &str = "scheduled";

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e.body_text())))
}

async fn tenant_for(state: &AppState, to: Option<&str>) -> Result<Tenant, ApiError> {
    Ok(resolve_tenant(state.store.as_ref(), to).await?)
}

async fn lead_for(state: &AppState, tenant: &Tenant, raw_id: &str) -> Result<Lead, ApiError> {
    let lead_id = parse_lead_id(raw_id)?;
    state
        .store
        .get_lead(tenant.id, lead_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lead not found".to_string()))
}

/// Worker references must point at one of the tenant's own workers.
async fn ensure_worker(state: &AppState, tenant: &Tenant, worker_id: Option<Uuid>) -> Result<(), ApiError> {
    let Some(worker_id) = worker_id else {
        return Ok(());
    };
    let workers = state.store.list_workers(tenant.id).await?;
    if workers.iter().any(|w| w.id == worker_id) {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Unknown assigned_worker_id".to_string()))
    }
}

pub async fn bootstrap(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<BootstrapResponse>, ApiError> {
    let tenant = tenant_for(&state, query.to.as_deref()).await?;
    let workers = state.store.list_workers(tenant.id).await?;
    Ok(Json(BootstrapResponse {
        business: tenant,
        workers,
        lead_status_options: lead_status_options(),
    }))
}

pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadsQuery>,
) -> Result<Json<Value>, ApiError> {
    let tenant = tenant_for(&state, query.to.as_deref()).await?;
    let filter = query.to_filter()?;
    let leads = state.store.list_leads(tenant.id, &filter).await?;
    Ok(Json(json!({ "leads": leads })))
}

pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<Value>, ApiError> {
    let tenant = tenant_for(&state, query.to.as_deref()).await?;
    let lead = lead_for(&state, &tenant, &id).await?;
    Ok(Json(json!({ "lead": lead })))
}

pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let tenant = tenant_for(&state, query.to.as_deref()).await?;
    let before = lead_for(&state, &tenant, &id).await?;
    let changes = lead_changes_from_json(&json_body(body)?)?;
    ensure_worker(&state, &tenant, changes.assigned_worker_id.flatten()).await?;

    let after = state
        .store
        .update_lead(tenant.id, before.id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lead not found".to_string()))?;

    state
        .store
        .insert_event(
            NewEvent::new(tenant.id, EventType::LeadUpdated, json!({ "before": before, "after": after }))
                .for_lead(after.id),
        )
        .await?;
    info!("Lead {} updated (tenant {})", after.id, tenant.id);

    Ok(Json(json!({ "lead": after })))
}

pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<Value>, ApiError> {
    let tenant = tenant_for(&state, query.to.as_deref()).await?;
    let lead = lead_for(&state, &tenant, &id).await?;
    let notes = state.store.list_notes(tenant.id, lead.id).await?;
    Ok(Json(json!({ "notes": notes })))
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
    body: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let tenant = tenant_for(&state, query.to.as_deref()).await?;
    let lead = lead_for(&state, &tenant, &id).await?;
    let request = json_body(body)?;
    let text = non_blank(request.body.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Note body is required".to_string()))?;

    let note = state.store.insert_note(tenant.id, lead.id, &text).await?;
    state
        .store
        .insert_event(
            NewEvent::new(tenant.id, EventType::LeadNoteAdded, json!({ "noteId": note.id })).for_lead(lead.id),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "note": note }))))
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Value>, ApiError> {
    let tenant = tenant_for(&state, query.to.as_deref()).await?;
    let range = AppointmentRange {
        start: parse_optional_timestamp(query.start.as_deref(), "start")?,
        end: parse_optional_timestamp(query.end.as_deref(), "end")?,
    };
    let appointments = state.store.list_appointments(tenant.id, &range).await?;
    Ok(Json(json!({ "appointments": appointments })))
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TenantQuery>,
    body: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let tenant = tenant_for(&state, query.to.as_deref()).await?;
    let request = json_body(body)?;

    let starts_at = parse_optional_timestamp(request.starts_at.as_deref(), "starts_at")?
        .ok_or_else(|| ApiError::BadRequest("Missing starts_at".to_string()))?;
    let ends_at = parse_optional_timestamp(request.ends_at.as_deref(), "ends_at")?;
    if ends_at.is_some_and(|end| end < starts_at) {
        return Err(ApiError::BadRequest("ends_at must not be before starts_at".to_string()));
    }

    let lead_id = parse_optional_id(request.lead_id.as_deref(), "lead_id")?;
    if let Some(lead_id) = lead_id {
        if state.store.get_lead(tenant.id, lead_id).await?.is_none() {
            return Err(ApiError::BadRequest("Unknown lead_id".to_string()));
        }
    }
    let assigned_worker_id = parse_optional_id(request.assigned_worker_id.as_deref(), "assigned_worker_id")?;
    ensure_worker(&state, &tenant, assigned_worker_id).await?;

    let appointment = state
        .store
        .insert_appointment(NewAppointment {
            tenant_id: tenant.id,
            lead_id,
            title: request.title.unwrap_or_default().trim().to_string(),
            address: request.address.unwrap_or_default().trim().to_string(),
            starts_at,
            ends_at,
            status: non_blank(request.status.as_deref()).unwrap_or_else(|| DEFAULT_APPOINTMENT_STATUS.to_string()),
            assigned_worker_id,
        })
        .await?;

    let mut event = NewEvent::new(
        tenant.id,
        EventType::AppointmentCreated,
        json!({ "appointmentId": appointment.id, "starts_at": appointment.starts_at }),
    );
    if let Some(lead_id) = appointment.lead_id {
        event = event.for_lead(lead_id);
    }
    state.store.insert_event(event).await?;
    info!("Appointment {} created (tenant {})", appointment.id, tenant.id);

    Ok((StatusCode::CREATED, Json(json!({ "appointment": appointment }))))
}

pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let tenant = tenant_for(&state, query.to.as_deref()).await?;
    let days = analytics_days(query.days.as_deref());
    let since = Utc::now() - Duration::days(days);

    let counts = state.store.event_counts(tenant.id, since).await?;
    let kpis = Kpis::from_counts(&counts);
    Ok(Json(AnalyticsResponse {
        since,
        days,
        counts,
        kpis,
    }))
}
