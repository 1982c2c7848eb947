use super::{lead_matches_query, StoreError, TenantStore};
use crate::core::shared::models::{
    Appointment, AppointmentRange, ConsentOrigin, ConsentRecord, ConsentSource, Event, Lead,
    LeadChanges, LeadFilter, LeadStatus, NewAppointment, NewEvent, Note, Tenant, Worker,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    tenants: Vec<Tenant>,
    workers: Vec<Worker>,
    leads: Vec<Lead>,
    consents: Vec<ConsentRecord>,
    events: Vec<Event>,
    appointments: Vec<Appointment>,
    notes: Vec<Note>,
}

/// Process-local store used by tests and `LEADLINE_STORE=memory` development runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_tenant(&self, name: &str, owner_phone: &str, twilio_number: &str) -> Tenant {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_phone: owner_phone.to_string(),
            twilio_number: twilio_number.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.tenants.push(tenant.clone());
        tenant
    }

    pub async fn insert_worker(&self, tenant_id: Uuid, name: &str, phone: Option<&str>) -> Worker {
        let worker = Worker {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            phone: phone.map(str::to_string),
            active: true,
            created_at: Utc::now(),
        };
        self.tables.write().await.workers.push(worker.clone());
        worker
    }

    /// Append an event with an explicit timestamp, for analytics windows.
    pub async fn insert_event_at(&self, event: NewEvent, at: DateTime<Utc>) -> Event {
        let event = event.into_event(at);
        self.tables.write().await.events.push(event.clone());
        event
    }

    pub async fn events(&self, tenant_id: Uuid) -> Vec<Event> {
        self.tables
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub async fn leads(&self, tenant_id: Uuid) -> Vec<Lead> {
        self.tables
            .read()
            .await
            .leads
            .iter()
            .filter(|l| l.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub async fn consents(&self, tenant_id: Uuid) -> Vec<ConsentRecord> {
        self.tables
            .read()
            .await
            .consents
            .iter()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn tenant_by_number(&self, twilio_number: &str) -> Result<Option<Tenant>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tenants
            .iter()
            .find(|t| t.twilio_number == twilio_number)
            .cloned())
    }

    async fn list_workers(&self, tenant_id: Uuid) -> Result<Vec<Worker>, StoreError> {
        let tables = self.tables.read().await;
        let mut workers: Vec<Worker> = tables
            .workers
            .iter()
            .filter(|w| w.tenant_id == tenant_id && w.active)
            .cloned()
            .collect();
        workers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workers)
    }

    async fn has_consent(&self, tenant_id: Uuid, customer_phone: &str) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .consents
            .iter()
            .any(|c| c.tenant_id == tenant_id && c.customer_phone == customer_phone))
    }

    async fn insert_consent(
        &self,
        tenant_id: Uuid,
        customer_phone: &str,
        source: ConsentSource,
        origin: ConsentOrigin,
    ) -> Result<ConsentRecord, StoreError> {
        let record = ConsentRecord {
            id: Uuid::new_v4(),
            tenant_id,
            customer_phone: customer_phone.to_string(),
            ip: origin.ip,
            user_agent: origin.user_agent,
            source: source.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.consents.push(record.clone());
        Ok(record)
    }

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        Ok(self.insert_event_at(event, Utc::now()).await)
    }

    async fn event_counts(
        &self,
        tenant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        let tables = self.tables.read().await;
        let mut counts = BTreeMap::new();
        for event in tables
            .events
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.created_at >= since)
        {
            *counts.entry(event.event_type.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn upsert_inbound_lead(
        &self,
        tenant_id: Uuid,
        customer_phone: &str,
        last_message: &str,
    ) -> Result<Lead, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(lead) = tables
            .leads
            .iter_mut()
            .find(|l| l.tenant_id == tenant_id && l.customer_phone == customer_phone)
        {
            lead.last_message = Some(last_message.to_string());
            lead.status = LeadStatus::Open.as_str().to_string();
            lead.updated_at = now;
            return Ok(lead.clone());
        }

        let lead = Lead {
            id: Uuid::new_v4(),
            tenant_id,
            customer_phone: customer_phone.to_string(),
            customer_name: None,
            job_address: None,
            assigned_worker_id: None,
            status: LeadStatus::Open.as_str().to_string(),
            last_message: Some(last_message.to_string()),
            created_at: now,
            updated_at: now,
        };
        tables.leads.push(lead.clone());
        Ok(lead)
    }

    async fn list_leads(&self, tenant_id: Uuid, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        let tables = self.tables.read().await;
        let mut leads: Vec<Lead> = tables
            .leads
            .iter()
            .filter(|l| l.tenant_id == tenant_id)
            .filter(|l| filter.status.map_or(true, |s| l.status == s.as_str()))
            .filter(|l| filter.q.as_deref().map_or(true, |q| lead_matches_query(l, q)))
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(leads
            .into_iter()
            .skip(usize::try_from(filter.offset).unwrap_or(0))
            .take(usize::try_from(filter.limit).unwrap_or(0))
            .collect())
    }

    async fn get_lead(&self, tenant_id: Uuid, lead_id: Uuid) -> Result<Option<Lead>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .leads
            .iter()
            .find(|l| l.id == lead_id && l.tenant_id == tenant_id)
            .cloned())
    }

    async fn update_lead(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        changes: &LeadChanges,
    ) -> Result<Option<Lead>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(lead) = tables
            .leads
            .iter_mut()
            .find(|l| l.id == lead_id && l.tenant_id == tenant_id)
        else {
            return Ok(None);
        };
        changes.apply_to(lead, Utc::now());
        Ok(Some(lead.clone()))
    }

    async fn list_notes(&self, tenant_id: Uuid, lead_id: Uuid) -> Result<Vec<Note>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .iter()
            .filter(|n| n.tenant_id == tenant_id && n.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn insert_note(&self, tenant_id: Uuid, lead_id: Uuid, body: &str) -> Result<Note, StoreError> {
        let note = Note {
            id: Uuid::new_v4(),
            tenant_id,
            lead_id,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.notes.push(note.clone());
        Ok(note)
    }

    async fn list_appointments(
        &self,
        tenant_id: Uuid,
        range: &AppointmentRange,
    ) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .filter(|a| range.start.map_or(true, |start| a.starts_at >= start))
            .filter(|a| range.end.map_or(true, |end| a.starts_at <= end))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        Ok(appointments)
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let appointment = appointment.into_appointment(Utc::now());
        self.tables
            .write()
            .await
            .appointments
            .push(appointment.clone());
        Ok(appointment)
    }
}
