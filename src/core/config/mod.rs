use anyhow::{anyhow, Result};

pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub twilio: TwilioConfig,
    pub store: StoreBackend,
    /// Public origin the provider calls back on, without a trailing slash.
    pub public_base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub api_base: String,
    pub validate_signatures: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("Missing required env var: {key}"));

        let store = match get("LEADLINE_STORE").as_deref() {
            Some("memory") => StoreBackend::Memory,
            Some("postgres") | None => StoreBackend::Postgres {
                database_url: required("DATABASE_URL")?,
            },
            Some(other) => return Err(anyhow!("Unknown LEADLINE_STORE backend: {other}")),
        };

        let port = match get("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| anyhow!("Invalid PORT {p:?}: {e}"))?,
            None => 3000,
        };

        Ok(AppConfig {
            server: ServerConfig {
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
            },
            twilio: TwilioConfig {
                account_sid: required("TWILIO_ACCOUNT_SID")?,
                auth_token: required("TWILIO_AUTH_TOKEN")?,
                api_base: get("TWILIO_API_BASE")
                    .map(|base| base.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
                validate_signatures: get("TWILIO_VALIDATE_SIGNATURES").as_deref() == Some("true"),
            },
            store,
            public_base_url: get("PUBLIC_BASE_URL").map(|url| url.trim_end_matches('/').to_string()),
        })
    }
}
