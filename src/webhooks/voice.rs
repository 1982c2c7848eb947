use axum::{
    extract::{OriginalUri, Query, State},
    http::HeaderMap,
    response::Response,
    Form,
};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use super::voice_flow::{self, CallOutcome, FollowUp, Stage, AUTO_TEXT_BODY};
use super::{callback_base, twiml_response, verify_signature, WebhookError};
use crate::consent::{has_consent, record_consent};
use crate::core::shared::models::{ConsentSource, EventType, NewEvent, Tenant};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::non_blank;
use crate::core::tenant::resolve_tenant;
use crate::security::ClientMeta;

#[derive(Debug, Deserialize)]
pub struct VoiceQuery {
    pub stage: Option<String>,
}

/// Fields of a voice callback this router reads.
#[derive(Debug)]
struct CallParams<'a> {
    call_sid: Option<&'a str>,
    from: Option<&'a str>,
    to: Option<&'a str>,
    caller: Option<String>,
}

impl<'a> CallParams<'a> {
    fn from_form(params: &'a HashMap<String, String>) -> Self {
        let from = params.get("From").map(String::as_str);
        Self {
            call_sid: params.get("CallSid").map(String::as_str),
            from,
            to: params.get("To").map(String::as_str),
            caller: non_blank(from),
        }
    }
}

pub async fn handle_voice(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VoiceQuery>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    client: ClientMeta,
    Form(params): Form<HashMap<String, String>>,
) -> Result<Response, WebhookError> {
    verify_signature(&state, &headers, &uri, &params)?;

    let tenant = resolve_tenant(state.store.as_ref(), params.get("To").map(String::as_str)).await?;
    let stage = Stage::parse(query.stage.as_deref()).map_err(WebhookError::UnknownStage)?;
    let call = CallParams::from_form(&params);
    let base = callback_base(&state.config, &headers);
    debug!("Voice {} for tenant {} call {:?}", stage.as_str(), tenant.id, call.call_sid);

    let consented = match stage {
        Stage::Incoming => on_incoming(&state, &tenant, &call).await?,
        Stage::Consent => {
            on_consent(&state, &tenant, &call, params.get("Digits").map(String::as_str), client).await?;
            false
        }
        Stage::Dial => false,
        Stage::DialEnd => {
            on_dial_end(&state, &tenant, &call, params.get("DialCallStatus").map(String::as_str)).await?;
            false
        }
    };

    let twiml = voice_flow::instruction(stage, &tenant, consented, base.as_deref());
    Ok(twiml_response(twiml.to_xml()))
}

async fn on_incoming(state: &AppState, tenant: &Tenant, call: &CallParams<'_>) -> Result<bool, WebhookError> {
    state
        .store
        .insert_event(NewEvent::new(
            tenant.id,
            EventType::IncomingCall,
            json!({ "callSid": call.call_sid, "from": call.from, "to": call.to }),
        ))
        .await?;

    Ok(has_consent(state.store.as_ref(), tenant.id, call.caller.as_deref()).await?)
}

async fn on_consent(
    state: &AppState,
    tenant: &Tenant,
    call: &CallParams<'_>,
    digits: Option<&str>,
    client: ClientMeta,
) -> Result<(), WebhookError> {
    let Some(caller) = call.caller.as_deref().filter(|c| voice_flow::wants_opt_in(digits, Some(*c))) else {
        return Ok(());
    };

    record_consent(
        state.store.as_ref(),
        tenant.id,
        caller,
        ConsentSource::VoiceGather,
        client.into_origin(),
    )
    .await?;
    state
        .store
        .insert_event(NewEvent::new(
            tenant.id,
            EventType::SmsOptIn,
            json!({ "callSid": call.call_sid, "from": caller, "via": ConsentSource::VoiceGather.as_str() }),
        ))
        .await?;
    Ok(())
}

async fn on_dial_end(
    state: &AppState,
    tenant: &Tenant,
    call: &CallParams<'_>,
    dial_status: Option<&str>,
) -> Result<(), WebhookError> {
    let dial_status = dial_status.unwrap_or_default();
    let outcome = voice_flow::classify_dial_status(dial_status);
    let event_type = match outcome {
        CallOutcome::Missed => EventType::MissedCall,
        CallOutcome::Answered => EventType::CallAnswered,
    };
    state
        .store
        .insert_event(NewEvent::new(
            tenant.id,
            event_type,
            json!({ "callSid": call.call_sid, "from": call.from, "to": call.to, "dialStatus": dial_status }),
        ))
        .await?;

    if outcome == CallOutcome::Answered {
        return Ok(());
    }

    let caller = call.caller.as_deref();
    let consented = has_consent(state.store.as_ref(), tenant.id, caller).await?;
    let payload = json!({
        "callSid": call.call_sid,
        "toCustomer": caller,
        "fromBusiness": tenant.twilio_number,
    });

    match (voice_flow::follow_up(consented), caller) {
        (FollowUp::AutoText, Some(caller)) => {
            state
                .telephony
                .send_sms(tenant.twilio_number.trim(), caller, AUTO_TEXT_BODY)
                .await?;
            state
                .store
                .insert_event(NewEvent::new(tenant.id, EventType::AutoTextSent, payload))
                .await?;
            info!("Missed call from {caller}: auto-text sent for tenant {}", tenant.id);
        }
        _ => {
            state
                .store
                .insert_event(NewEvent::new(tenant.id, EventType::AutoTextSkippedNoConsent, payload))
                .await?;
            info!("Missed call for tenant {}: no consent, auto-text skipped", tenant.id);
        }
    }
    Ok(())
}
