//! Tenant-scoped JSON API behind the lead inbox. Every request names its tenant
//! with the `to` query parameter (the tenant's inbound number).

pub mod error;
pub mod handlers;
pub mod types;

pub use error::ApiError;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::consent::submit_consent;
use crate::core::shared::state::AppState;

pub fn configure_app_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/app/bootstrap", get(handlers::bootstrap))
        .route("/app/leads", get(handlers::list_leads))
        .route("/app/leads/:id", get(handlers::get_lead).patch(handlers::update_lead))
        .route("/app/leads/:id/notes", get(handlers::list_notes).post(handlers::create_note))
        .route(
            "/app/appointments",
            get(handlers::list_appointments).post(handlers::create_appointment),
        )
        .route("/app/analytics", get(handlers::analytics))
        .route("/consent", post(submit_consent))
}
