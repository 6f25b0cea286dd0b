//! Request metadata helpers: client IP, user agent, trace id.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header::USER_AGENT, request::Parts, Extensions, HeaderMap};
use tower_http::request_id::RequestId;

/// Headers consulted, in order, for the originating client address
const CLIENT_IP_HEADERS: &[&str] = &[
    "x-forwarded-for",
    "x-real-ip",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http_client_ip",
    "http_x_forwarded_for",
];

/// Resolve the client IP, preferring proxy headers over the socket peer.
///
/// A header value may be a comma separated chain; the first entry that is
/// not `unknown` wins.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    for name in CLIENT_IP_HEADERS {
        let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        let candidate = value
            .split(',')
            .map(str::trim)
            .find(|ip| !ip.is_empty() && !ip.eq_ignore_ascii_case("unknown"));
        if let Some(ip) = candidate {
            return Some(ip.to_string());
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Trace id of the current request, if any.
///
/// Uses the id assigned by the request-id layer, falling back to an
/// inbound `traceparent` / `x-trace-id` header.
pub fn trace_id(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    if let Some(id) = extensions
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
    {
        return Some(id.to_string());
    }

    if let Some(parent) = headers.get("traceparent").and_then(|v| v.to_str().ok()) {
        // version-traceid-parentid-flags
        if let Some(trace) = parent.split('-').nth(1) {
            return Some(trace.to_string());
        }
    }

    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Caller details recorded with login logs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_ip: String,
    pub user_agent: String,
    pub trace_id: String,
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientInfo {
            user_ip: client_ip(&parts.headers, &parts.extensions).unwrap_or_default(),
            user_agent: user_agent(&parts.headers),
            trace_id: trace_id(&parts.headers, &parts.extensions).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_client_ip_skips_unknown_entries() {
        let h = headers(&[("x-forwarded-for", "unknown, 10.0.0.7, 10.0.0.1")]);
        assert_eq!(client_ip(&h, &Extensions::new()).as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_client_ip_header_precedence() {
        let h = headers(&[("x-real-ip", "192.168.1.2"), ("proxy-client-ip", "172.16.0.1")]);
        assert_eq!(client_ip(&h, &Extensions::new()).as_deref(), Some("192.168.1.2"));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let mut ext = Extensions::new();
        ext.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5000))));
        assert_eq!(client_ip(&HeaderMap::new(), &ext).as_deref(), Some("127.0.0.1"));
        assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), None);
    }

    #[test]
    fn test_trace_id_sources() {
        let mut ext = Extensions::new();
        ext.insert(RequestId::new(HeaderValue::from_static("req-1")));
        assert_eq!(trace_id(&HeaderMap::new(), &ext).as_deref(), Some("req-1"));

        let h = headers(&[("traceparent", "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")]);
        assert_eq!(
            trace_id(&h, &Extensions::new()).as_deref(),
            Some("4bf92f3577b34da6a3ce929d0e0e4736")
        );
        assert_eq!(trace_id(&HeaderMap::new(), &Extensions::new()), None);
    }

    #[test]
    fn test_user_agent_defaults_empty() {
        assert_eq!(user_agent(&HeaderMap::new()), "");
        assert_eq!(user_agent(&headers(&[("user-agent", "curl/8")])), "curl/8");
    }
}
