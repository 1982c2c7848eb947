#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use leadline::core::config::AppConfig;
use leadline::core::shared::models::Tenant;
use leadline::core::shared::test_utils::{test_config, test_state, RecordingGateway};
use leadline::core::store::MemoryStore;
use leadline::main_module::build_router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const BUSINESS_NUMBER: &str = "+15550001111";
pub const OWNER_PHONE: &str = "+15559998888";
pub const CALLER: &str = "+15551234567";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<RecordingGateway>,
    pub tenant: Tenant,
    app: Router,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(test_config(), RecordingGateway::new()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        Self::build(config, RecordingGateway::new()).await
    }

    pub async fn with_failing_gateway() -> Self {
        Self::build(test_config(), RecordingGateway::failing()).await
    }

    async fn build(config: AppConfig, gateway: RecordingGateway) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(gateway);
        let tenant = store
            .insert_tenant("Acme Plumbing", OWNER_PHONE, BUSINESS_NUMBER)
            .await;
        let app = build_router(test_state(config, store.clone(), gateway.clone()));
        Self {
            store,
            gateway,
            tenant,
            app,
        }
    }

    pub async fn event_types(&self) -> Vec<String> {
        self.store
            .events(self.tenant.id)
            .await
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> (StatusCode, String) {
        self.send(form_request(uri).body(Body::from(encode_form(fields))).unwrap())
            .await
    }

    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        let (status, text) = self.send(request).await;
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.json(Method::GET, uri, None).await
    }
}

pub fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn form_request(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
}

/// Percent-encoded `to` query value for the tenant's number.
pub fn to_param() -> String {
    urlencoding::encode(BUSINESS_NUMBER).into_owned()
}
