use super::TelephonyGateway;
use crate::core::config::TwilioConfig;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub sid: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioApiError {
    pub code: i32,
    pub message: String,
    pub more_info: Option<String>,
    pub status: i32,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TwilioError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Twilio API error {}: {}", .0.code, .0.message)]
    ApiError(TwilioApiError),
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Outbound Twilio REST client, one per process.
pub struct TwilioClient {
    config: TwilioConfig,
    http_client: Client,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        )
    }
}

#[async_trait]
impl TelephonyGateway for TwilioClient {
    async fn send_sms(&self, from: &str, to: &str, body: &str) -> Result<SentMessage, TwilioError> {
        let params = [("To", to), ("From", from), ("Body", body)];

        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| TwilioError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let api_error: TwilioApiError =
                response.json().await.unwrap_or_else(|_| TwilioApiError {
                    code: 0,
                    message: "Unknown error".to_string(),
                    more_info: None,
                    status: i32::from(status.as_u16()),
                });
            error!(
                "Twilio rejected message to {}: {} {}",
                to, api_error.code, api_error.message
            );
            return Err(TwilioError::ApiError(api_error));
        }

        let message: TwilioMessageResponse = response
            .json()
            .await
            .map_err(|e| TwilioError::ParseError(e.to_string()))?;

        debug!("Twilio accepted message {} ({})", message.sid, message.status);

        Ok(SentMessage {
            sid: message.sid,
            status: message.status,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> TwilioClient {
        TwilioClient::new(TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            api_base: server.url(),
            validate_signatures: false,
        })
    }

    #[tokio::test]
    async fn test_send_sms_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/Accounts/AC123/Messages.json")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("To".to_string(), "+15551234567".to_string()),
                Matcher::UrlEncoded("From".to_string(), "+15550001111".to_string()),
                Matcher::UrlEncoded("Body".to_string(), "hi there".to_string()),
            ]))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sid":"SM42","status":"queued","to":"+15551234567"}"#)
            .create_async()
            .await;

        let sent = client_for(&server)
            .send_sms("+15550001111", "+15551234567", "hi there")
            .await
            .unwrap();

        assert_eq!(sent.sid, "SM42");
        assert_eq!(sent.status, "queued");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_sms_surfaces_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/Accounts/AC123/Messages.json")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":21211,"message":"Invalid 'To' Phone Number","more_info":null,"status":400}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .send_sms("+15550001111", "bogus", "hi")
            .await
            .unwrap_err();

        match err {
            TwilioError::ApiError(api) => assert_eq!(api.code, 21211),
            other => panic!("unexpected error: {other}"),
        }
    }
}
