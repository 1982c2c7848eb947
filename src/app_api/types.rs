use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::ApiError;
use crate::core::shared::models::{LeadChanges, LeadFilter, LeadStatus, Tenant, Worker};
use crate::core::shared::utils::non_blank;

pub const DEFAULT_LEAD_LIMIT: i64 = 50;
pub const MAX_LEAD_LIMIT: i64 = 100;
pub const DEFAULT_ANALYTICS_DAYS: i64 = 30;
pub const MAX_ANALYTICS_DAYS: i64 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadsQuery {
    pub to: Option<String>,
    pub q: Option<String>,
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentsQuery {
    pub to: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub to: Option<String>,
    pub days: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub lead_id: Option<String>,
    pub title: Option<String>,
    pub address: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "assigned_tech_id")]
    pub assigned_worker_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResponse {
    pub business: Tenant,
    pub workers: Vec<Worker>,
    pub lead_status_options: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub missed_calls: i64,
    pub auto_texts: i64,
    pub inbound_sms: i64,
    pub consent_skips: i64,
    pub recovery_rate: Option<f64>,
}

impl Kpis {
    pub fn from_counts(counts: &BTreeMap<String, i64>) -> Self {
        let count = |key: &str| counts.get(key).copied().unwrap_or(0);
        let missed_calls = count("missed_call");
        let inbound_sms = count("inbound_sms");
        Self {
            missed_calls,
            auto_texts: count("auto_text_sent"),
            inbound_sms,
            consent_skips: count("auto_text_skipped_no_consent"),
            recovery_rate: recovery_rate(missed_calls, inbound_sms),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub since: DateTime<Utc>,
    pub days: i64,
    pub counts: BTreeMap<String, i64>,
    pub kpis: Kpis,
}

/// Replies per missed call. Undefined without missed calls.
pub fn recovery_rate(missed_calls: i64, inbound_sms: i64) -> Option<f64> {
    (missed_calls > 0).then(|| inbound_sms as f64 / missed_calls as f64)
}

/// Lenient integer parameter: unparsable or absent values take the default.
pub fn int_param(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(default)
}

pub fn analytics_days(raw: Option<&str>) -> i64 {
    match int_param(raw, DEFAULT_ANALYTICS_DAYS) {
        0 => DEFAULT_ANALYTICS_DAYS,
        days => days.clamp(1, MAX_ANALYTICS_DAYS),
    }
}

impl LeadsQuery {
    pub fn to_filter(&self) -> Result<LeadFilter, ApiError> {
        let status = non_blank(self.status.as_deref())
            .map(|s| s.parse::<LeadStatus>())
            .transpose()
            .map_err(ApiError::BadRequest)?;
        let limit = match int_param(self.limit.as_deref(), DEFAULT_LEAD_LIMIT) {
            0 => DEFAULT_LEAD_LIMIT,
            limit => limit.clamp(1, MAX_LEAD_LIMIT),
        };
        Ok(LeadFilter {
            q: non_blank(self.q.as_deref()),
            status,
            limit,
            offset: int_param(self.offset.as_deref(), 0).max(0),
        })
    }
}

pub fn parse_lead_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest("Invalid lead id".to_string()))
}

pub fn parse_optional_id(raw: Option<&str>, field: &str) -> Result<Option<Uuid>, ApiError> {
    non_blank(raw)
        .map(|id| Uuid::parse_str(&id))
        .transpose()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}

/// Accepts RFC 3339 timestamps or bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn parse_optional_timestamp(raw: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(value) => parse_timestamp(&value)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid {field}"))),
    }
}

fn text_change(body: &Map<String, Value>, field: &str) -> Result<Option<Option<String>>, ApiError> {
    match body.get(field) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(s)) => Ok(Some(non_blank(Some(s.as_str())))),
        Some(_) => Err(ApiError::BadRequest(format!("{field} must be a string"))),
    }
}

/// Builds the allow-listed update from a PATCH body. Unknown keys are ignored;
/// empty strings and `null` clear nullable fields.
pub fn lead_changes_from_json(body: &Value) -> Result<LeadChanges, ApiError> {
    let body = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Expected a JSON object".to_string()))?;

    let assigned_worker_id = match text_change(body, "assigned_worker_id")? {
        None => None,
        Some(None) => Some(None),
        Some(Some(id)) => Some(Some(
            Uuid::parse_str(&id).map_err(|_| ApiError::BadRequest("Invalid assigned_worker_id".to_string()))?,
        )),
    };

    let status = match body.get("status") {
        None => None,
        Some(Value::String(s)) => Some(s.trim().parse::<LeadStatus>().map_err(ApiError::BadRequest)?),
        Some(other) => return Err(ApiError::BadRequest(format!("Invalid status: {other}"))),
    };

    Ok(LeadChanges {
        customer_name: text_change(body, "customer_name")?,
        job_address: text_change(body, "job_address")?,
        assigned_worker_id,
        status,
    })
}

pub fn lead_status_options() -> Vec<&'static str> {
    LeadStatus::ALL.iter().map(|s| s.as_str()).collect()
}
