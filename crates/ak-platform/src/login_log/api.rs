//! Login Logs Admin API

use axum::{
    extract::{Query, State},
    Json,
};
use ak_common::{CommonResult, PageResult, UserType};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::login_log::entity::{LoginLog, LoginLogFilter, LoginLogType, LoginResult};
use crate::login_log::service::LoginLogService;
use crate::shared::api_common::PageParam;
use crate::shared::error::PlatformError;
use crate::shared::middleware::{require_admin, Authenticated};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginLogResponse {
    pub id: i64,
    #[schema(value_type = i32)]
    pub log_type: LoginLogType,
    pub trace_id: String,
    pub user_id: Option<i64>,
    #[schema(value_type = i32)]
    pub user_type: UserType,
    pub username: String,
    #[schema(value_type = i32)]
    pub result: LoginResult,
    pub user_ip: String,
    pub user_agent: String,
    /// Epoch milliseconds
    pub create_time: i64,
}

impl From<LoginLog> for LoginLogResponse {
    fn from(log: LoginLog) -> Self {
        Self {
            id: log.id,
            log_type: log.log_type,
            trace_id: log.trace_id,
            user_id: log.user_id,
            user_type: log.user_type,
            username: log.username,
            result: log.result,
            user_ip: log.user_ip,
            user_agent: log.user_agent,
            create_time: log.create_time.timestamp_millis(),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LoginLogPageQuery {
    #[serde(default, deserialize_with = "crate::shared::api_common::deserialize_u32_opt")]
    pub page_no: Option<u32>,
    #[serde(default, deserialize_with = "crate::shared::api_common::deserialize_u32_opt")]
    pub page_size: Option<u32>,
    /// Client IP contains
    pub user_ip: Option<String>,
    /// Username contains
    pub username: Option<String>,
    /// true = successful logins only, false = failures only
    pub status: Option<bool>,
}

#[derive(Clone)]
pub struct LoginLogsState {
    pub login_log_service: LoginLogService,
}

/// Page login logs, newest first
#[utoipa::path(
    get,
    path = "/page",
    tag = "login-logs",
    operation_id = "getAdminApiSystemLoginLogPage",
    params(LoginLogPageQuery),
    responses(
        (status = 200, description = "One page of login logs", body = CommonResult<PageResult<LoginLogResponse>>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_login_log_page(
    State(state): State<LoginLogsState>,
    auth: Authenticated,
    Query(query): Query<LoginLogPageQuery>,
) -> Result<Json<CommonResult<PageResult<LoginLogResponse>>>, PlatformError> {
    require_admin(&auth.0)?;

    let page = PageParam::new(query.page_no.unwrap_or(1), query.page_size.unwrap_or(0));
    let filter = LoginLogFilter {
        user_ip: query.user_ip,
        username: query.username,
        success: query.status,
    };
    let result = state.login_log_service.get_login_log_page(&filter, &page).await?;

    Ok(Json(CommonResult::success(result.map(LoginLogResponse::from))))
}

pub fn login_logs_router(state: LoginLogsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_login_log_page))
        .with_state(state)
}
