//! User Sessions Admin API
//!
//! Listing of live sessions and forced logout by record id.

use axum::{
    extract::{Query, State},
    http::Method,
    Json,
};
use ak_common::{CommonResult, PageResult, UserType};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::operate_log::{ApiDoc, EndpointDescriptor, OperateLogContext, OperateLogInterceptor};
use crate::session::entity::{UserSession, UserSessionPageReq};
use crate::session::service::UserSessionService;
use crate::shared::api_common::IdQuery;
use crate::shared::error::PlatformError;
use crate::shared::middleware::{require_admin, Authenticated};

const API_TAG: &str = "User sessions";

/// Session as listed to administrators; the token itself is never exposed
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSessionResponse {
    pub id: i64,
    pub user_id: i64,
    #[schema(value_type = i32)]
    pub user_type: UserType,
    pub username: String,
    pub user_ip: String,
    pub user_agent: String,
    /// Epoch milliseconds
    pub session_timeout: i64,
    /// Epoch milliseconds
    pub create_time: i64,
}

impl From<UserSession> for UserSessionResponse {
    fn from(session: UserSession) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            user_type: session.user_type,
            username: session.username,
            user_ip: session.user_ip,
            user_agent: session.user_agent,
            session_timeout: session.session_timeout.timestamp_millis(),
            create_time: session.create_time.timestamp_millis(),
        }
    }
}

#[derive(Clone)]
pub struct UserSessionsState {
    pub session_service: UserSessionService,
}

/// Page live sessions, newest first
#[utoipa::path(
    get,
    path = "/page",
    tag = "user-sessions",
    operation_id = "getAdminApiSystemUserSessionPage",
    params(UserSessionPageReq),
    responses(
        (status = 200, description = "One page of sessions", body = CommonResult<PageResult<UserSessionResponse>>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user_session_page(
    State(state): State<UserSessionsState>,
    auth: Authenticated,
    Query(req): Query<UserSessionPageReq>,
) -> Result<Json<CommonResult<PageResult<UserSessionResponse>>>, PlatformError> {
    require_admin(&auth.0)?;

    let page = state.session_service.get_user_session_page(&req).await?;
    Ok(Json(CommonResult::success(page.map(UserSessionResponse::from))))
}

/// Force a session out
#[utoipa::path(
    delete,
    path = "/delete",
    tag = "user-sessions",
    operation_id = "deleteAdminApiSystemUserSessionDelete",
    params(IdQuery),
    responses(
        (status = 200, description = "Session deleted", body = CommonResult<bool>),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user_session(
    State(state): State<UserSessionsState>,
    auth: Authenticated,
    oplog: OperateLogContext,
    Query(query): Query<IdQuery>,
) -> Result<Json<CommonResult<bool>>, PlatformError> {
    require_admin(&auth.0)?;

    if let Some(session) = state.session_service.get_user_session(query.id).await? {
        oplog.set_content(format!("Forced logout of {}", session.username));
        oplog.add_ext("userId", session.user_id);
    }
    state.session_service.delete_user_session_by_id(query.id).await?;

    Ok(Json(CommonResult::success(true)))
}

pub fn user_sessions_router(state: UserSessionsState, oplog: &OperateLogInterceptor) -> OpenApiRouter {
    let delete = EndpointDescriptor::new("UserSessionApi::delete_user_session")
        .method(Method::DELETE)
        .operation("Delete user session")
        .api(ApiDoc::tagged(API_TAG));

    OpenApiRouter::new()
        .routes(routes!(get_user_session_page))
        .routes(oplog.audited(routes!(delete_user_session), delete))
        .with_state(state)
}
