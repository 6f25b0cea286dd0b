//! API Middleware
//!
//! Token authentication for Axum. The token is taken from the
//! `Authorization: Bearer` header or the session cookie and resolved to a
//! cached `LoginUser`, which is placed into the request extensions for the
//! extractors and the operate-log layer. Verified sessions slide: their
//! expiry is pushed forward once a third of the timeout has elapsed.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, header::COOKIE, request::Parts, Request},
    response::Response,
};
use chrono::Utc;
use tower::{Layer, Service};
use tracing::warn;

use crate::session::{LoginUser, UserSessionService};
use crate::shared::error::PlatformError;

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "ak_token";

/// Raw token of the authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

/// Strip the `Bearer ` prefix from an Authorization header value
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn extract_session_cookie(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|c| c.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Token from the Authorization header, falling back to the session cookie
pub fn extract_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .map(String::from)
        .or_else(|| extract_session_cookie(headers))
}

/// Fail with 403 unless the caller is an administrator
pub fn require_admin(login_user: &LoginUser) -> Result<(), PlatformError> {
    if login_user.is_admin() {
        Ok(())
    } else {
        Err(PlatformError::forbidden("Administrator access required"))
    }
}

/// Authenticated user extractor
pub struct Authenticated(pub LoginUser);

impl std::ops::Deref for Authenticated {
    type Target = LoginUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<LoginUser>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| PlatformError::unauthorized("Missing or expired session token"))
    }
}

/// Layer that resolves the request token into a `LoginUser`
#[derive(Clone)]
pub struct TokenAuthLayer {
    sessions: UserSessionService,
}

impl TokenAuthLayer {
    pub fn new(sessions: UserSessionService) -> Self {
        Self { sessions }
    }
}

impl<S> Layer<S> for TokenAuthLayer {
    type Service = TokenAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenAuthMiddleware {
            inner,
            sessions: self.sessions.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TokenAuthMiddleware<S> {
    inner: S,
    sessions: UserSessionService,
}

impl<S, B> Service<Request<B>> for TokenAuthMiddleware<S>
where
    S: Service<Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // The clone is not ready; keep the polled service for this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let sessions = self.sessions.clone();

        Box::pin(async move {
            if let Some(token) = extract_token(req.headers()) {
                match sessions.get_login_user(&token).await {
                    Ok(Some(login_user)) => {
                        let login_user = if sessions.needs_refresh(&login_user, Utc::now()) {
                            let refreshed = sessions.refresh_user_session(&token, &login_user).await;
                            match refreshed {
                                Ok(refreshed) => refreshed,
                                Err(e) => {
                                    warn!(user_id = login_user.id, error = %e, "Failed to refresh session");
                                    login_user
                                }
                            }
                        } else {
                            login_user
                        };
                        req.extensions_mut().insert(login_user);
                        req.extensions_mut().insert(SessionToken(token));
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Failed to resolve session token"),
                }
            }
            inner.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_token_from_cookie_when_no_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark; ak_token=t0k".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("t0k".to_string()));

        headers.insert(AUTHORIZATION, "Bearer hdr".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("hdr".to_string()));
    }

    #[test]
    fn test_require_admin() {
        use ak_common::UserType;
        assert!(require_admin(&LoginUser::new(1, UserType::Admin)).is_ok());
        assert!(matches!(
            require_admin(&LoginUser::new(1, UserType::Member)),
            Err(PlatformError::Forbidden { .. })
        ));
    }
}
