mod common;

#[cfg(test)]
mod app_api_integration_tests {
    use super::common::{to_param, Harness, CALLER};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use chrono::{Duration, Utc};
    use leadline::core::shared::models::{EventType, NewEvent};
    use leadline::core::store::TenantStore;
    use serde_json::{json, Value};

    async fn seed_lead(h: &Harness, phone: &str, message: &str) -> String {
        h.store
            .upsert_inbound_lead(h.tenant.id, phone, message)
            .await
            .unwrap()
            .id
            .to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let h = Harness::new().await;
        let (status, body) = h.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_bootstrap_lists_tenant_workers_and_statuses() {
        let h = Harness::new().await;
        h.store.insert_worker(h.tenant.id, "Sam", Some("+15550004444")).await;

        let (status, body) = h.get(&format!("/app/bootstrap?to={}", to_param())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["business"]["name"], "Acme Plumbing");
        assert_eq!(body["workers"].as_array().unwrap().len(), 1);
        assert_eq!(
            body["leadStatusOptions"],
            json!(["new", "open", "quoted", "scheduled", "in-progress", "done"])
        );
    }

    #[tokio::test]
    async fn test_selector_errors() {
        let h = Harness::new().await;

        let (status, body) = h.get("/app/leads").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing to" }));

        let (status, body) = h.get("/app/analytics?to=%2B15550009999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Unknown Twilio number (no tenant configured)" }));

        let (status, body) = h.get(&format!("/app/leads/not-a-uuid?to={}", to_param())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid lead id");
    }

    #[tokio::test]
    async fn test_leads_are_tenant_scoped() {
        let h = Harness::new().await;
        let other = h.store.insert_tenant("Other Co", "+15559997777", "+15550002222").await;
        let foreign = h
            .store
            .upsert_inbound_lead(other.id, CALLER, "other tenant lead")
            .await
            .unwrap();
        seed_lead(&h, CALLER, "our lead").await;

        let (_, body) = h.get(&format!("/app/leads?to={}", to_param())).await;
        let leads = body["leads"].as_array().unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0]["last_message"], "our lead");

        let (status, body) = h
            .get(&format!("/app/leads/{}?to={}", foreign.id, to_param()))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Lead not found");
    }

    #[tokio::test]
    async fn test_lead_search_status_and_paging() {
        let h = Harness::new().await;
        seed_lead(&h, "+15551110001", "roof leak").await;
        seed_lead(&h, "+15551110002", "Water heater").await;
        let third = seed_lead(&h, "+15551110003", "WATER in basement").await;
        h.json(
            Method::PATCH,
            &format!("/app/leads/{third}?to={}", to_param()),
            Some(json!({ "status": "quoted" })),
        )
        .await;

        let (_, body) = h.get(&format!("/app/leads?to={}&q=water", to_param())).await;
        assert_eq!(body["leads"].as_array().unwrap().len(), 2);

        let (_, body) = h
            .get(&format!("/app/leads?to={}&q=water&status=quoted", to_param()))
            .await;
        assert_eq!(body["leads"].as_array().unwrap().len(), 1);
        assert_eq!(body["leads"][0]["id"], third.as_str());

        let (_, body) = h
            .get(&format!("/app/leads?to={}&limit=2&offset=2", to_param()))
            .await;
        assert_eq!(body["leads"].as_array().unwrap().len(), 1);

        let (status, _) = h.get(&format!("/app/leads?to={}&status=closed", to_param())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_patch_applies_allow_list_and_logs_event() {
        let h = Harness::new().await;
        let worker = h.store.insert_worker(h.tenant.id, "Sam", None).await;
        let id = seed_lead(&h, CALLER, "need help").await;
        let uri = format!("/app/leads/{id}?to={}", to_param());

        let (status, body) = h
            .json(
                Method::PATCH,
                &uri,
                Some(json!({
                    "customer_name": " Dana ",
                    "job_address": "5 Elm St",
                    "assigned_worker_id": worker.id,
                    "status": "scheduled",
                    "customer_phone": "+10000000000",
                    "tenant_id": "00000000-0000-0000-0000-000000000000"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lead"]["customer_name"], "Dana");
        assert_eq!(body["lead"]["status"], "scheduled");
        assert_eq!(body["lead"]["customer_phone"], CALLER);
        assert_eq!(body["lead"]["assigned_worker_id"], worker.id.to_string());

        let events = h.store.events(h.tenant.id).await;
        let updated = events.iter().find(|e| e.event_type == "lead_updated").unwrap();
        assert_eq!(updated.payload["before"]["status"], "open");
        assert_eq!(updated.payload["after"]["status"], "scheduled");

        let (status, body) = h
            .json(Method::PATCH, &uri, Some(json!({ "job_address": "", "customer_name": null })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lead"]["job_address"], Value::Null);
        assert_eq!(body["lead"]["customer_name"], Value::Null);
    }

    #[tokio::test]
    async fn test_patch_rejections() {
        let h = Harness::new().await;
        let other = h.store.insert_tenant("Other Co", "+15559997777", "+15550002222").await;
        let foreign_worker = h.store.insert_worker(other.id, "Lee", None).await;
        let id = seed_lead(&h, CALLER, "need help").await;
        let uri = format!("/app/leads/{id}?to={}", to_param());

        let (status, _) = h.json(Method::PATCH, &uri, Some(json!({ "status": "closed" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = h
            .json(Method::PATCH, &uri, Some(json!({ "assigned_worker_id": foreign_worker.id })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown assigned_worker_id");

        let request = Request::builder()
            .method(Method::PATCH)
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = h.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h
            .json(
                Method::PATCH,
                &format!("/app/leads/{}?to={}", uuid::Uuid::new_v4(), to_param()),
                Some(json!({ "status": "done" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert!(!h.event_types().await.contains(&"lead_updated".to_string()));
    }

    #[tokio::test]
    async fn test_notes_reject_blank_body() {
        let h = Harness::new().await;
        let id = seed_lead(&h, CALLER, "need help").await;
        let uri = format!("/app/leads/{id}/notes?to={}", to_param());

        for blank in [json!({ "body": "   " }), json!({ "body": "" }), json!({})] {
            let (status, body) = h.json(Method::POST, &uri, Some(blank)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Note body is required");
        }

        let (status, body) = h
            .json(Method::POST, &uri, Some(json!({ "body": " Called back, quote sent " })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["note"]["body"], "Called back, quote sent");

        let (status, body) = h.get(&uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notes"].as_array().unwrap().len(), 1);

        let note_events: Vec<_> = h
            .store
            .events(h.tenant.id)
            .await
            .into_iter()
            .filter(|e| e.event_type == "lead_note_added")
            .collect();
        assert_eq!(note_events.len(), 1);
        assert_eq!(note_events[0].payload["noteId"], body["notes"][0]["id"]);
    }

    #[tokio::test]
    async fn test_appointments_create_and_list_by_range() {
        let h = Harness::new().await;
        let lead = seed_lead(&h, CALLER, "need help").await;
        let uri = format!("/app/appointments?to={}", to_param());

        let (status, body) = h
            .json(
                Method::POST,
                &uri,
                Some(json!({
                    "lead_id": lead,
                    "title": "Fix pipe",
                    "address": "5 Elm St",
                    "starts_at": "2024-06-03T14:00:00Z",
                    "ends_at": "2024-06-03T15:00:00Z"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["appointment"]["status"], "scheduled");
        assert_eq!(body["appointment"]["lead_id"], lead.as_str());

        h.json(
            Method::POST,
            &uri,
            Some(json!({ "title": "Quote", "starts_at": "2024-07-01T09:00:00Z" })),
        )
        .await;

        let (_, body) = h
            .get(&format!("{uri}&start=2024-06-01&end=2024-06-30"))
            .await;
        let appointments = body["appointments"].as_array().unwrap();
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0]["title"], "Fix pipe");

        let (_, body) = h.get(&uri).await;
        assert_eq!(body["appointments"].as_array().unwrap().len(), 2);

        let created = h.store.events(h.tenant.id).await;
        assert_eq!(
            created.iter().filter(|e| e.event_type == "appointment_created").count(),
            2
        );
    }

    #[tokio::test]
    async fn test_appointment_validation() {
        let h = Harness::new().await;
        let uri = format!("/app/appointments?to={}", to_param());

        let (status, body) = h.json(Method::POST, &uri, Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing starts_at");

        let (status, _) = h
            .json(
                Method::POST,
                &uri,
                Some(json!({ "starts_at": "2024-06-03T14:00:00Z", "ends_at": "2024-06-03T13:00:00Z" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = h
            .json(
                Method::POST,
                &uri,
                Some(json!({ "starts_at": "2024-06-03T14:00:00Z", "lead_id": uuid::Uuid::new_v4() })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown lead_id");
        assert!(h.event_types().await.is_empty());
    }

    #[tokio::test]
    async fn test_analytics_recovery_rate() {
        let h = Harness::new().await;
        let now = Utc::now();
        for _ in 0..10 {
            h.store
                .insert_event_at(NewEvent::new(h.tenant.id, EventType::MissedCall, json!({})), now)
                .await;
        }
        for _ in 0..4 {
            h.store
                .insert_event_at(NewEvent::new(h.tenant.id, EventType::InboundSms, json!({})), now)
                .await;
        }
        h.store
            .insert_event_at(
                NewEvent::new(h.tenant.id, EventType::MissedCall, json!({})),
                now - Duration::days(45),
            )
            .await;

        let (status, body) = h.get(&format!("/app/analytics?to={}&days=30", to_param())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"], 30);
        assert_eq!(body["counts"]["missed_call"], 10);
        assert_eq!(body["kpis"]["missedCalls"], 10);
        assert_eq!(body["kpis"]["inboundSms"], 4);
        assert_eq!(body["kpis"]["recoveryRate"], 0.4);

        let (_, body) = h.get(&format!("/app/analytics?to={}&days=90", to_param())).await;
        assert_eq!(body["kpis"]["missedCalls"], 11);
    }

    #[tokio::test]
    async fn test_analytics_without_missed_calls() {
        let h = Harness::new().await;
        h.store
            .insert_event_at(NewEvent::new(h.tenant.id, EventType::InboundSms, json!({})), Utc::now())
            .await;

        let (_, body) = h.get(&format!("/app/analytics?to={}", to_param())).await;
        assert_eq!(body["days"], 30);
        assert_eq!(body["kpis"]["recoveryRate"], Value::Null);
    }

    #[tokio::test]
    async fn test_web_consent() {
        let h = Harness::new().await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/consent")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header(header::USER_AGENT, "Mozilla/5.0")
            .body(Body::from(
                json!({ "to": "+15550001111", "phone": CALLER, "consent": true }).to_string(),
            ))
            .unwrap();
        let (status, body) = h.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "ok": true }));

        let consents = h.store.consents(h.tenant.id).await;
        assert_eq!(consents.len(), 1);
        assert_eq!(consents[0].source, "web_form");
        assert_eq!(consents[0].ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(consents[0].user_agent.as_deref(), Some("Mozilla/5.0"));

        let events = h.store.events(h.tenant.id).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "sms_opt_in");
        assert_eq!(events[0].payload, json!({ "customerPhone": CALLER, "ip": "203.0.113.7" }));
    }

    #[tokio::test]
    async fn test_web_consent_rejections() {
        let h = Harness::new().await;
        let cases = [
            (json!({ "to": "+15550001111", "phone": CALLER }), StatusCode::BAD_REQUEST, "Consent must be true"),
            (json!({ "phone": CALLER, "consent": true }), StatusCode::BAD_REQUEST, "Missing to"),
            (json!({ "to": "+15550001111", "consent": true }), StatusCode::BAD_REQUEST, "Missing phone"),
            (
                json!({ "to": "+15550009999", "phone": CALLER, "consent": true }),
                StatusCode::NOT_FOUND,
                "Unknown Twilio number (no tenant configured)",
            ),
        ];

        for (payload, expected_status, expected_error) in cases {
            let (status, body) = h.json(Method::POST, "/consent", Some(payload)).await;
            assert_eq!(status, expected_status);
            assert_eq!(body["error"], expected_error);
        }
        assert!(h.store.consents(h.tenant.id).await.is_empty());
    }
}
