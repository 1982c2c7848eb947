diesel::table! {
    businesses (id) {
        id -> Uuid,
        name -> Varchar,
        owner_phone -> Varchar,
        twilio_number -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    workers (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        name -> Varchar,
        phone -> Nullable<Varchar>,
        active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    leads (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        customer_phone -> Varchar,
        customer_name -> Nullable<Varchar>,
        job_address -> Nullable<Text>,
        assigned_worker_id -> Nullable<Uuid>,
        status -> Varchar,
        last_message -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    sms_consents (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        customer_phone -> Varchar,
        ip -> Nullable<Varchar>,
        user_agent -> Nullable<Text>,
        source -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    events (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        lead_id -> Nullable<Uuid>,
        event_type -> Varchar,
        payload -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    appointments (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        lead_id -> Nullable<Uuid>,
        title -> Varchar,
        address -> Text,
        starts_at -> Timestamptz,
        ends_at -> Nullable<Timestamptz>,
        status -> Varchar,
        assigned_worker_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    lead_notes (id) {
        id -> Uuid,
        tenant_id -> Uuid,
        lead_id -> Uuid,
        body -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(workers -> businesses (tenant_id));
diesel::joinable!(leads -> businesses (tenant_id));
diesel::joinable!(sms_consents -> businesses (tenant_id));
diesel::joinable!(events -> businesses (tenant_id));
diesel::joinable!(appointments -> businesses (tenant_id));
diesel::joinable!(lead_notes -> leads (lead_id));

diesel::allow_tables_to_appear_in_same_query!(
    businesses,
    workers,
    leads,
    sms_consents,
    events,
    appointments,
    lead_notes,
);
