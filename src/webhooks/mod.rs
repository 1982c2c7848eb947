//! Provider-facing webhooks. Bodies are form-encoded, responses are TwiML or plain text.

pub mod sms;
pub mod voice;
pub mod voice_flow;

use axum::{
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use log::{error, warn};
use std::collections::HashMap;

use crate::channels::TwilioError;
use crate::core::config::AppConfig;
use crate::core::shared::state::AppState;
use crate::core::store::StoreError;
use crate::core::tenant::ResolveError;
use crate::security::{validate_webhook_signature, SIGNATURE_HEADER};

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Missing To")]
    MissingTo,
    #[error("Unknown Twilio number (no tenant configured)")]
    UnknownNumber(String),
    #[error("Missing From")]
    MissingFrom,
    #[error("Unknown stage")]
    UnknownStage(String),
    #[error("Invalid Twilio signature")]
    InvalidSignature,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Telephony error: {0}")]
    Telephony(#[from] TwilioError),
}

impl From<ResolveError> for WebhookError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Missing => Self::MissingTo,
            ResolveError::NotFound(number) => Self::UnknownNumber(number),
            ResolveError::Store(e) => Self::Store(e),
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingTo | Self::MissingFrom | Self::UnknownStage(_) => StatusCode::BAD_REQUEST,
            Self::UnknownNumber(number) => {
                warn!("Webhook for unregistered number {number}");
                StatusCode::NOT_FOUND
            }
            Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::Telephony(_) => {
                error!("Webhook failed: {self}");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response();
            }
        };
        (status, self.to_string()).into_response()
    }
}

pub(crate) fn twiml_response(xml: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], xml).into_response()
}

/// Origin the provider reaches us on: the configured public URL, else the forwarded host.
pub fn callback_base(config: &AppConfig, headers: &HeaderMap) -> Option<String> {
    if let Some(base) = &config.public_base_url {
        return Some(base.trim_end_matches('/').to_string());
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())?;
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|p| !p.is_empty())
        .unwrap_or("https");
    Some(format!("{proto}://{host}"))
}

/// Rejects the request unless validation is disabled or the signature matches the public URL.
pub fn verify_signature(
    state: &AppState,
    headers: &HeaderMap,
    uri: &Uri,
    params: &HashMap<String, String>,
) -> Result<(), WebhookError> {
    let twilio = &state.config.twilio;
    if !twilio.validate_signatures {
        return Ok(());
    }
    let base = callback_base(&state.config, headers).ok_or(WebhookError::InvalidSignature)?;
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = format!("{base}{path}");
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if validate_webhook_signature(&twilio.auth_token, signature, &url, params) {
        Ok(())
    } else {
        warn!("Rejected webhook with bad signature for {url}");
        Err(WebhookError::InvalidSignature)
    }
}
