//! Call-flow decisions. The provider keeps no state between callbacks, so the current
//! stage travels on each callback URL and every function here is a pure mapping from
//! (stage, inputs) to the next instruction.

use crate::channels::{VoiceResponse, VoiceVerb};
use crate::core::shared::models::Tenant;

pub const OPT_IN_DIGIT: &str = "1";
pub const GATHER_TIMEOUT_SECS: u32 = 5;
pub const RING_TIMEOUT_SECS: u32 = 20;

/// Dial outcomes that count as a missed call. Everything else was answered.
pub const MISSED_DIAL_STATUSES: [&str; 4] = ["no-answer", "busy", "failed", "canceled"];

pub const AUTO_TEXT_BODY: &str = "Sorry we missed your call — what do you need help with? Reply with the job + address. Reply STOP to opt out.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Incoming,
    Consent,
    Dial,
    DialEnd,
}

impl Stage {
    /// The provider's first callback carries no stage marker.
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw.unwrap_or("incoming") {
            "incoming" => Ok(Self::Incoming),
            "consent" => Ok(Self::Consent),
            "dial" => Ok(Self::Dial),
            "dial_end" => Ok(Self::DialEnd),
            other => Err(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Consent => "consent",
            Self::Dial => "dial",
            Self::DialEnd => "dial_end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Missed,
    Answered,
}

pub fn classify_dial_status(status: &str) -> CallOutcome {
    if MISSED_DIAL_STATUSES.contains(&status) {
        CallOutcome::Missed
    } else {
        CallOutcome::Answered
    }
}

pub fn wants_opt_in(digits: Option<&str>, caller: Option<&str>) -> bool {
    digits == Some(OPT_IN_DIGIT) && caller.is_some()
}

/// What to do after a missed call. Consent is the only gate on the auto-text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    AutoText,
    SkipNoConsent,
}

pub fn follow_up(consented: bool) -> FollowUp {
    if consented {
        FollowUp::AutoText
    } else {
        FollowUp::SkipNoConsent
    }
}

pub fn consent_prompt(business_name: &str) -> String {
    format!(
        "Press 1 to opt in to receive a single text message from {business_name} if we miss your call. \
         Message and data rates may apply. Reply STOP to opt out."
    )
}

/// Callback address for `stage`, relative when no public base is known.
pub fn stage_url(base: Option<&str>, stage: Stage) -> String {
    format!("{}/voice?stage={}", base.unwrap_or(""), stage.as_str())
}

/// Markup returned for `stage`. `consented` only matters on the incoming leg.
pub fn instruction(stage: Stage, tenant: &Tenant, consented: bool, base: Option<&str>) -> VoiceResponse {
    let dial = VoiceVerb::Redirect {
        url: stage_url(base, Stage::Dial),
    };
    match stage {
        Stage::Incoming if consented => VoiceResponse::new().verb(dial),
        Stage::Incoming => VoiceResponse::new()
            .verb(VoiceVerb::Gather {
                num_digits: 1,
                timeout_secs: GATHER_TIMEOUT_SECS,
                action: stage_url(base, Stage::Consent),
                prompt: consent_prompt(&tenant.name),
            })
            .verb(dial),
        Stage::Consent => VoiceResponse::new().verb(dial),
        Stage::Dial => VoiceResponse::new().verb(VoiceVerb::Dial {
            action: stage_url(base, Stage::DialEnd),
            timeout_secs: RING_TIMEOUT_SECS,
            number: tenant.owner_phone.trim().to_string(),
        }),
        Stage::DialEnd => VoiceResponse::new().verb(VoiceVerb::Hangup),
    }
}
