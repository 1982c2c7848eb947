pub mod twilio_sms;
pub mod twiml;

pub use twilio_sms::{SentMessage, TwilioApiError, TwilioClient, TwilioError};
pub use twiml::{MessagingResponse, VoiceResponse, VoiceVerb};

use async_trait::async_trait;

/// Outbound messaging capability of the telephony provider.
#[async_trait]
pub trait TelephonyGateway: Send + Sync {
    async fn send_sms(&self, from: &str, to: &str, body: &str) -> Result<SentMessage, TwilioError>;
}
