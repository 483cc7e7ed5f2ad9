use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, HOST, USER_AGENT},
        request::Parts,
    },
};

use super::session::SessionHandle;
use crate::types::ClientInfo;

pub const SESSION_COOKIE: &str = "chatgate_session";

/// The session handle presented by the client, if any and well-formed.
pub struct SessionCookie(pub Option<SessionHandle>);

/// The `Host` the request was addressed to.
pub struct RequestHost(pub Option<String>);

/// Peers allowed to report the client address through forwarding headers.
///
/// Installed as a request extension. Without it no forwarding header is believed.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<[IpAddr]>);

impl TrustedProxies {
    #[must_use]
    pub fn new(proxies: Vec<IpAddr>) -> Self {
        Self(proxies.into())
    }

    #[must_use]
    pub fn trusts(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionCookie {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let handle = parse_cookie(&parts.headers, SESSION_COOKIE)
            .as_deref()
            .and_then(SessionHandle::parse);
        Ok(SessionCookie(handle))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestHost {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.host().map(str::to_string));
        Ok(RequestHost(host))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let forwarded = match (peer, parts.extensions.get::<TrustedProxies>()) {
            (Some(peer), Some(proxies)) if proxies.trusts(&peer) => {
                forwarded_client(&parts.headers, proxies)
            }
            _ => None,
        };
        let ip = forwarded
            .or_else(|| peer.map(|ip| ip.to_string()))
            .unwrap_or_default();
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(ClientInfo { ip, user_agent })
    }
}

/// Nearest `X-Forwarded-For` hop that is not itself a trusted proxy, then `X-Real-IP`.
fn forwarded_client(headers: &HeaderMap, proxies: &TrustedProxies) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| {
            v.rsplit(',')
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
                .find(|hop| !hop.parse::<IpAddr>().is_ok_and(|ip| proxies.trusts(&ip)))
        });

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded.or_else(real_ip).map(str::to_string)
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(handle: &SessionHandle) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={}; HttpOnly; SameSite=Lax; Path=/",
        handle.as_str()
    ))
    .ok()
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "chatgate_session=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; SameSite=Lax; Path=/",
    )
}
