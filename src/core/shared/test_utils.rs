use crate::channels::{SentMessage, TelephonyGateway, TwilioError};
use crate::core::config::{AppConfig, ServerConfig, StoreBackend, TwilioConfig};
use crate::core::shared::state::AppState;
use crate::core::store::TenantStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const TEST_AUTH_TOKEN: &str = "test-auth-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSms {
    pub from: String,
    pub to: String,
    pub body: String,
}

/// Telephony double that records every outbound message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<OutboundSms>>,
    fail: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose every send fails like an unreachable provider.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<OutboundSms> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl TelephonyGateway for RecordingGateway {
    async fn send_sms(&self, from: &str, to: &str, body: &str) -> Result<SentMessage, TwilioError> {
        if self.fail {
            return Err(TwilioError::NetworkError("connection refused".to_string()));
        }
        let mut sent = self.sent.lock().await;
        sent.push(OutboundSms {
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(SentMessage {
            sid: format!("SM{:032}", sent.len()),
            status: "queued".to_string(),
        })
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        twilio: TwilioConfig {
            account_sid: "AC00000000000000000000000000000000".to_string(),
            auth_token: TEST_AUTH_TOKEN.to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            validate_signatures: false,
        },
        store: StoreBackend::Memory,
        public_base_url: Some("https://leadline.test".to_string()),
    }
}

pub fn test_state(
    config: AppConfig,
    store: Arc<dyn TenantStore>,
    telephony: Arc<dyn TelephonyGateway>,
) -> Arc<AppState> {
    Arc::new(AppState::new(config, store, telephony))
}
