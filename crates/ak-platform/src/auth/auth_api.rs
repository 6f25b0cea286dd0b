//! Authentication API
//!
//! Login issues an opaque session token, returned in the body and as the
//! session cookie. Logout ends that session.

use axum::{
    extract::State,
    http::{HeaderMap, Method},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use ak_common::CommonResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::auth_service::AdminAuthService;
use crate::operate_log::{ApiDoc, EndpointDescriptor, OperateLogInterceptor, OperateLogOptions};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{extract_token, SESSION_COOKIE_NAME};
use crate::shared::request_info::ClientInfo;

const API_TAG: &str = "Authentication";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: i64,
    pub access_token: String,
    /// Epoch milliseconds
    pub expires_time: i64,
}

#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AdminAuthService,
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    operation_id = "postAdminApiSystemAuthLogin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = CommonResult<LoginResponse>),
        (status = 400, description = "Bad credentials or disabled account")
    )
)]
pub async fn login(
    State(state): State<AuthApiState>,
    client: ClientInfo,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<CommonResult<LoginResponse>>), PlatformError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(PlatformError::validation("Username and password are required"));
    }

    let grant = state
        .auth_service
        .login(req.username.trim(), &req.password, &client)
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE_NAME, grant.access_token.clone()))
        .path("/")
        .http_only(true)
        .build();

    Ok((
        jar.add(cookie),
        Json(CommonResult::success(LoginResponse {
            user_id: grant.user_id,
            access_token: grant.access_token,
            expires_time: grant.expires_time.timestamp_millis(),
        })),
    ))
}

/// Log out the current session
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    operation_id = "postAdminApiSystemAuthLogout",
    responses(
        (status = 200, description = "Logged out", body = CommonResult<bool>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AuthApiState>,
    client: ClientInfo,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<CommonResult<bool>>), PlatformError> {
    if let Some(token) = extract_token(&headers) {
        state.auth_service.logout(&token, &client).await?;
    }

    let cleared = Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build();
    Ok((jar.remove(cleared), Json(CommonResult::success(true))))
}

pub fn auth_router(state: AuthApiState, oplog: &OperateLogInterceptor) -> OpenApiRouter {
    // Credentials must never reach the audit trail
    let login_endpoint = EndpointDescriptor::new("AuthApi::login")
        .method(Method::POST)
        .operation("Log in")
        .options(OperateLogOptions::new().disabled())
        .api(ApiDoc::tagged(API_TAG));
    let logout_endpoint = EndpointDescriptor::new("AuthApi::logout")
        .method(Method::POST)
        .operation("Log out")
        .api(ApiDoc::tagged(API_TAG));

    OpenApiRouter::new()
        .routes(oplog.audited(routes!(login), login_endpoint))
        .routes(oplog.audited(routes!(logout), logout_endpoint))
        .with_state(state)
}
