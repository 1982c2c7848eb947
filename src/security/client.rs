use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::core::shared::models::ConsentOrigin;

/// Caller origin metadata recorded alongside opt-ins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());

        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|ua| !ua.is_empty())
            .map(str::to_string);

        Self {
            ip: forwarded.or_else(|| peer.map(|addr| addr.ip().to_string())),
            user_agent,
        }
    }

    pub fn into_origin(self) -> ConsentOrigin {
        ConsentOrigin {
            ip: self.ip,
            user_agent: self.user_agent,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_headers(&parts.headers, peer))
    }
}
