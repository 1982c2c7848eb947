use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use super::schema;

use super::schema::{appointments, businesses, events, lead_notes, leads, sms_consents, workers};

/// A business owning one inbound telephony number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = businesses)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub owner_phone: String,
    pub twilio_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = workers)]
pub struct Worker {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = leads)]
pub struct Lead {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_phone: String,
    pub customer_name: Option<String>,
    pub job_address: Option<String>,
    pub assigned_worker_id: Option<Uuid>,
    pub status: String,
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = sms_consents)]
pub struct ConsentRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_phone: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = events)]
pub struct Event {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lead_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = appointments)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub title: String,
    pub address: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: String,
    pub assigned_worker_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = lead_notes)]
pub struct Note {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lead_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    #[serde(rename = "new")]
    New,
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "quoted")]
    Quoted,
    #[serde(rename = "scheduled")]
    Scheduled,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        Self::New,
        Self::Open,
        Self::Quoted,
        Self::Scheduled,
        Self::InProgress,
        Self::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Open => "open",
            Self::Quoted => "quoted",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid status: {s}"))
    }
}

/// Every domain occurrence recorded in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    IncomingCall,
    MissedCall,
    CallAnswered,
    InboundSms,
    AutoTextSent,
    AutoTextSkippedNoConsent,
    SmsOptIn,
    OwnerNotified,
    AppointmentCreated,
    LeadUpdated,
    LeadNoteAdded,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncomingCall => "incoming_call",
            Self::MissedCall => "missed_call",
            Self::CallAnswered => "call_answered",
            Self::InboundSms => "inbound_sms",
            Self::AutoTextSent => "auto_text_sent",
            Self::AutoTextSkippedNoConsent => "auto_text_skipped_no_consent",
            Self::SmsOptIn => "sms_opt_in",
            Self::OwnerNotified => "owner_notified",
            Self::AppointmentCreated => "appointment_created",
            Self::LeadUpdated => "lead_updated",
            Self::LeadNoteAdded => "lead_note_added",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an opt-in was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentSource {
    VoiceGather,
    WebForm,
}

impl ConsentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VoiceGather => "voice_gather",
            Self::WebForm => "web_form",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentOrigin {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub tenant_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub event_type: EventType,
    pub payload: serde_json::Value,
}

impl NewEvent {
    pub fn new(tenant_id: Uuid, event_type: EventType, payload: serde_json::Value) -> Self {
        Self {
            tenant_id,
            lead_id: None,
            event_type,
            payload,
        }
    }

    pub fn for_lead(mut self, lead_id: Uuid) -> Self {
        self.lead_id = Some(lead_id);
        self
    }

    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            lead_id: self.lead_id,
            event_type: self.event_type.as_str().to_string(),
            payload: self.payload,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub tenant_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub title: String,
    pub address: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: String,
    pub assigned_worker_id: Option<Uuid>,
}

impl NewAppointment {
    pub fn into_appointment(self, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            lead_id: self.lead_id,
            title: self.title,
            address: self.address,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: self.status,
            assigned_worker_id: self.assigned_worker_id,
            created_at: now,
        }
    }
}

/// Filters for the lead inbox. `limit` and `offset` are already clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadFilter {
    pub q: Option<String>,
    pub status: Option<LeadStatus>,
    pub limit: i64,
    pub offset: i64,
}

/// Validated allow-listed lead update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadChanges {
    pub customer_name: Option<Option<String>>,
    pub job_address: Option<Option<String>>,
    pub assigned_worker_id: Option<Option<Uuid>>,
    pub status: Option<LeadStatus>,
}

impl LeadChanges {
    pub fn apply_to(&self, lead: &mut Lead, now: DateTime<Utc>) {
        if let Some(name) = &self.customer_name {
            lead.customer_name = name.clone();
        }
        if let Some(address) = &self.job_address {
            lead.job_address = address.clone();
        }
        if let Some(worker) = self.assigned_worker_id {
            lead.assigned_worker_id = worker;
        }
        if let Some(status) = self.status {
            lead.status = status.as_str().to_string();
        }
        lead.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}
