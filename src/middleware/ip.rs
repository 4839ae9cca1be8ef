use axum::{
    extract::{connect_info::ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use crate::state::AppState;

/// Client IP for rate limiting. Proxy headers are consulted only when
/// `trust_proxy` is set; otherwise the socket address wins.
pub fn extract_ip_from_headers(headers: &HeaderMap, fallback: Option<IpAddr>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }
    fallback.unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(h) = headers.get("x-forwarded-for").and_then(|hv| hv.to_str().ok()) {
        if let Some(first) = h.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    headers.get("x-real-ip").and_then(|hv| hv.to_str().ok()).and_then(|h| h.trim().parse::<IpAddr>().ok())
}

/// Client IP as seen by handlers. Unlike `ConnectInfo`, this never rejects if the
/// connection info extension is absent (e.g. in tests driven through `oneshot`).
#[derive(Clone, Copy, Debug)]
pub struct ClientIp(pub IpAddr);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let remote = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip());
        let trust_proxy = state.config.server.trust_proxy_headers;
        Ok(ClientIp(extract_ip_from_headers(&parts.headers, remote, trust_proxy)))
    }
}
