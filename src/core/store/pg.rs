use super::{StoreError, TenantStore};
use crate::core::shared::models::{
    Appointment, AppointmentRange, ConsentOrigin, ConsentRecord, ConsentSource, Event, Lead,
    LeadChanges, LeadFilter, LeadStatus, NewAppointment, NewEvent, Note, Tenant, Worker,
};
use crate::core::shared::schema::{
    appointments, businesses, events, lead_notes, leads, sms_consents, workers,
};
use crate::core::shared::utils::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(AsChangeset)]
#[diesel(table_name = leads)]
struct LeadChangeset {
    customer_name: Option<Option<String>>,
    job_address: Option<Option<String>>,
    assigned_worker_id: Option<Option<Uuid>>,
    status: Option<String>,
    updated_at: DateTime<Utc>,
}

impl LeadChangeset {
    fn from_changes(changes: &LeadChanges, now: DateTime<Utc>) -> Self {
        Self {
            customer_name: changes.customer_name.clone(),
            job_address: changes.job_address.clone(),
            assigned_worker_id: changes.assigned_worker_id,
            status: changes.status.map(|s| s.as_str().to_string()),
            updated_at: now,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
    }

    pub async fn insert_tenant(
        &self,
        name: &str,
        owner_phone: &str,
        twilio_number: &str,
    ) -> Result<Tenant, StoreError> {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_phone: owner_phone.to_string(),
            twilio_number: twilio_number.to_string(),
            created_at: Utc::now(),
        };
        self.run(move |conn| {
            diesel::insert_into(businesses::table)
                .values(&tenant)
                .execute(conn)?;
            Ok(tenant)
        })
        .await
    }

    pub async fn insert_worker(
        &self,
        tenant_id: Uuid,
        name: &str,
        phone: Option<&str>,
    ) -> Result<Worker, StoreError> {
        let worker = Worker {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            phone: phone.map(str::to_string),
            active: true,
            created_at: Utc::now(),
        };
        self.run(move |conn| {
            diesel::insert_into(workers::table)
                .values(&worker)
                .execute(conn)?;
            Ok(worker)
        })
        .await
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn tenant_by_number(&self, twilio_number: &str) -> Result<Option<Tenant>, StoreError> {
        let number = twilio_number.to_string();
        self.run(move |conn| {
            businesses::table
                .filter(businesses::twilio_number.eq(number))
                .select(Tenant::as_select())
                .first(conn)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn list_workers(&self, tenant_id: Uuid) -> Result<Vec<Worker>, StoreError> {
        self.run(move |conn| {
            workers::table
                .filter(workers::tenant_id.eq(tenant_id))
                .filter(workers::active.eq(true))
                .order(workers::name.asc())
                .select(Worker::as_select())
                .load(conn)
                .map_err(StoreError::from)
        })
        .await
    }

    async fn has_consent(&self, tenant_id: Uuid, customer_phone: &str) -> Result<bool, StoreError> {
        let phone = customer_phone.to_string();
        self.run(move |conn| {
            diesel::select(diesel::dsl::exists(
                sms_consents::table
                    .filter(sms_consents::tenant_id.eq(tenant_id))
                    .filter(sms_consents::customer_phone.eq(phone)),
            ))
            .get_result::<bool>(conn)
            .map_err(StoreError::from)
        })
        .await
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
        self.run(move |conn| {
            diesel::insert_into(sms_consents::table)
                .values(&record)
                .execute(conn)?;
            Ok(record)
        })
        .await
    }

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let event = event.into_event(Utc::now());
        self.run(move |conn| {
            diesel::insert_into(events::table)
                .values(&event)
                .execute(conn)?;
            Ok(event)
        })
        .await
    }

    async fn event_counts(
        &self,
        tenant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        self.run(move |conn| {
            let rows: Vec<(String, i64)> = events::table
                .filter(events::tenant_id.eq(tenant_id))
                .filter(events::created_at.ge(since))
                .group_by(events::event_type)
                .select((events::event_type, diesel::dsl::count_star()))
                .load(conn)?;
            Ok(rows.into_iter().collect())
        })
        .await
    }

    async fn upsert_inbound_lead(
        &self,
        tenant_id: Uuid,
        customer_phone: &str,
        last_message: &str,
    ) -> Result<Lead, StoreError> {
        let phone = customer_phone.to_string();
        let message = last_message.to_string();
        self.run(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let existing: Option<Lead> = leads::table
                    .filter(leads::tenant_id.eq(tenant_id))
                    .filter(leads::customer_phone.eq(&phone))
                    .select(Lead::as_select())
                    .first(conn)
                    .optional()?;
                let now = Utc::now();

                match existing {
                    Some(lead) => diesel::update(leads::table.filter(leads::id.eq(lead.id)))
                        .set((
                            leads::last_message.eq(&message),
                            leads::status.eq(LeadStatus::Open.as_str()),
                            leads::updated_at.eq(now),
                        ))
                        .returning(Lead::as_returning())
                        .get_result(conn),
                    None => {
                        let lead = Lead {
                            id: Uuid::new_v4(),
                            tenant_id,
                            customer_phone: phone.clone(),
                            customer_name: None,
                            job_address: None,
                            assigned_worker_id: None,
                            status: LeadStatus::Open.as_str().to_string(),
                            last_message: Some(message.clone()),
                            created_at: now,
                            updated_at: now,
                        };
                        diesel::insert_into(leads::table)
                            .values(&lead)
                            .execute(conn)?;
                        Ok(lead)
                    }
                }
            })
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_leads(&self, tenant_id: Uuid, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let mut query = leads::table
                .filter(leads::tenant_id.eq(tenant_id))
                .into_boxed();

            if let Some(status) = filter.status {
                query = query.filter(leads::status.eq(status.as_str()));
            }

            if let Some(q) = filter.q {
                let pattern = format!("%{q}%");
                query = query.filter(
                    leads::customer_phone
                        .ilike(pattern.clone())
                        .or(leads::customer_name.ilike(pattern.clone()))
                        .or(leads::job_address.ilike(pattern.clone()))
                        .or(leads::last_message.ilike(pattern)),
                );
            }

            query
                .order(leads::updated_at.desc())
                .limit(filter.limit)
                .offset(filter.offset)
                .select(Lead::as_select())
                .load(conn)
                .map_err(StoreError::from)
        })
        .await
    }

    async fn get_lead(&self, tenant_id: Uuid, lead_id: Uuid) -> Result<Option<Lead>, StoreError> {
        self.run(move |conn| {
            leads::table
                .filter(leads::id.eq(lead_id))
                .filter(leads::tenant_id.eq(tenant_id))
                .select(Lead::as_select())
                .first(conn)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn update_lead(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        changes: &LeadChanges,
    ) -> Result<Option<Lead>, StoreError> {
        let changeset = LeadChangeset::from_changes(changes, Utc::now());
        self.run(move |conn| {
            diesel::update(
                leads::table
                    .filter(leads::id.eq(lead_id))
                    .filter(leads::tenant_id.eq(tenant_id)),
            )
            .set(&changeset)
            .returning(Lead::as_returning())
            .get_result(conn)
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_notes(&self, tenant_id: Uuid, lead_id: Uuid) -> Result<Vec<Note>, StoreError> {
        self.run(move |conn| {
            lead_notes::table
                .filter(lead_notes::tenant_id.eq(tenant_id))
                .filter(lead_notes::lead_id.eq(lead_id))
                .order(lead_notes::created_at.asc())
                .select(Note::as_select())
                .load(conn)
                .map_err(StoreError::from)
        })
        .await
    }

    async fn insert_note(&self, tenant_id: Uuid, lead_id: Uuid, body: &str) -> Result<Note, StoreError> {
        let note = Note {
            id: Uuid::new_v4(),
            tenant_id,
            lead_id,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.run(move |conn| {
            diesel::insert_into(lead_notes::table)
                .values(&note)
                .execute(conn)?;
            Ok(note)
        })
        .await
    }

    async fn list_appointments(
        &self,
        tenant_id: Uuid,
        range: &AppointmentRange,
    ) -> Result<Vec<Appointment>, StoreError> {
        let range = range.clone();
        self.run(move |conn| {
            let mut query = appointments::table
                .filter(appointments::tenant_id.eq(tenant_id))
                .into_boxed();

            if let Some(start) = range.start {
                query = query.filter(appointments::starts_at.ge(start));
            }
            if let Some(end) = range.end {
                query = query.filter(appointments::starts_at.le(end));
            }

            query
                .order(appointments::starts_at.asc())
                .select(Appointment::as_select())
                .load(conn)
                .map_err(StoreError::from)
        })
        .await
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let appointment = appointment.into_appointment(Utc::now());
        self.run(move |conn| {
            diesel::insert_into(appointments::table)
                .values(&appointment)
                .execute(conn)?;
            Ok(appointment)
        })
        .await
    }
}
