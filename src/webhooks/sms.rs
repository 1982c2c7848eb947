use axum::{
    extract::{OriginalUri, State},
    http::HeaderMap,
    response::Response,
    Form,
};
use log::info;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{twiml_response, verify_signature, WebhookError};
use crate::channels::MessagingResponse;
use crate::core::shared::models::{EventType, NewEvent};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::non_blank;
use crate::core::tenant::resolve_tenant;

pub const ACK_BODY: &str = "Got it — thanks! We’ll reach out ASAP.";

pub fn owner_notification(business_name: &str, caller: &str, text: &str, lead_id: Uuid) -> String {
    format!("New lead for {business_name}\nFrom: {caller}\nMessage: {text}\nLead ID: {lead_id}")
}

/// Inbound text: store it on the caller's lead, forward it to the owner, acknowledge the sender.
pub async fn handle_sms(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Result<Response, WebhookError> {
    verify_signature(&state, &headers, &uri, &params)?;

    let tenant = resolve_tenant(state.store.as_ref(), params.get("To").map(String::as_str)).await?;
    let caller = non_blank(params.get("From").map(String::as_str)).ok_or(WebhookError::MissingFrom)?;
    let text = params.get("Body").map(|b| b.trim()).unwrap_or_default();
    let message_sid = params.get("MessageSid");

    let lead = state.store.upsert_inbound_lead(tenant.id, &caller, text).await?;
    state
        .store
        .insert_event(
            NewEvent::new(
                tenant.id,
                EventType::InboundSms,
                json!({
                    "messageSid": message_sid,
                    "from": params.get("From"),
                    "to": params.get("To"),
                    "body": text,
                }),
            )
            .for_lead(lead.id),
        )
        .await?;

    let notification = owner_notification(&tenant.name, &caller, text, lead.id);
    state
        .telephony
        .send_sms(tenant.twilio_number.trim(), tenant.owner_phone.trim(), &notification)
        .await?;
    state
        .store
        .insert_event(
            NewEvent::new(
                tenant.id,
                EventType::OwnerNotified,
                json!({
                    "toOwner": tenant.owner_phone,
                    "fromBusiness": tenant.twilio_number,
                    "messageSid": message_sid,
                }),
            )
            .for_lead(lead.id),
        )
        .await?;
    info!("Inbound SMS from {caller} stored on lead {} (tenant {})", lead.id, tenant.id);

    Ok(twiml_response(MessagingResponse::new().message(ACK_BODY).to_xml()))
}
