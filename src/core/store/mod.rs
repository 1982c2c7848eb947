//! Tenant-scoped persistence behind a single capability trait.
//!
//! Every method takes the tenant id explicitly; implementations must never
//! return rows belonging to another tenant.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use crate::core::shared::models::{
    Appointment, AppointmentRange, ConsentOrigin, ConsentRecord, ConsentSource, Event, Lead,
    LeadChanges, LeadFilter, NewAppointment, NewEvent, Note, Tenant, Worker,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        Self::Connection(e.to_string())
    }
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn tenant_by_number(&self, twilio_number: &str) -> Result<Option<Tenant>, StoreError>;

    async fn list_workers(&self, tenant_id: Uuid) -> Result<Vec<Worker>, StoreError>;

    async fn has_consent(&self, tenant_id: Uuid, customer_phone: &str) -> Result<bool, StoreError>;

    async fn insert_consent(
        &self,
        tenant_id: Uuid,
        customer_phone: &str,
        source: ConsentSource,
        origin: ConsentOrigin,
    ) -> Result<ConsentRecord, StoreError>;

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError>;

    /// Event counts keyed by event type, for events created at or after `since`.
    async fn event_counts(
        &self,
        tenant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, i64>, StoreError>;

    /// Refresh the lead for (tenant, caller) with the latest inbound text,
    /// creating it when absent. Status is forced to `open` either way.
    async fn upsert_inbound_lead(
        &self,
        tenant_id: Uuid,
        customer_phone: &str,
        last_message: &str,
    ) -> Result<Lead, StoreError>;

    async fn list_leads(&self, tenant_id: Uuid, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError>;

    async fn get_lead(&self, tenant_id: Uuid, lead_id: Uuid) -> Result<Option<Lead>, StoreError>;

    async fn update_lead(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        changes: &LeadChanges,
    ) -> Result<Option<Lead>, StoreError>;

    async fn list_notes(&self, tenant_id: Uuid, lead_id: Uuid) -> Result<Vec<Note>, StoreError>;

    async fn insert_note(&self, tenant_id: Uuid, lead_id: Uuid, body: &str) -> Result<Note, StoreError>;

    async fn list_appointments(
        &self,
        tenant_id: Uuid,
        range: &AppointmentRange,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;
}

/// Case-insensitive substring match used by the in-memory lead search, mirroring `ILIKE '%q%'`.
pub(crate) fn lead_matches_query(lead: &Lead, q: &str) -> bool {
    let needle = q.to_lowercase();
    let hit = |value: Option<&str>| value.is_some_and(|v| v.to_lowercase().contains(&needle));
    hit(Some(lead.customer_phone.as_str()))
        || hit(lead.customer_name.as_deref())
        || hit(lead.job_address.as_deref())
        || hit(lead.last_message.as_deref())
}
