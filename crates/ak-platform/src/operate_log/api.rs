//! Operate Logs Admin API

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use ak_common::{CommonResult, PageResult, UserType};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::operate_log::entity::{OperateLog, OperateLogFilter, OperateType};
use crate::operate_log::service::OperateLogService;
use crate::shared::api_common::{deserialize_u32_opt, IdQuery, PageParam};
use crate::shared::db::from_millis;
use crate::shared::error::PlatformError;
use crate::shared::middleware::{require_admin, Authenticated};
use crate::user::AdminUserRepository;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperateLogResponse {
    pub id: i64,
    pub trace_id: String,
    pub user_id: i64,
    #[schema(value_type = i32)]
    pub user_type: UserType,
    pub module: String,
    pub name: String,
    #[schema(value_type = Option<i32>)]
    #[serde(rename = "type")]
    pub operate_type: Option<OperateType>,
    pub content: String,
    #[schema(value_type = Object)]
    pub exts: serde_json::Map<String, serde_json::Value>,
    pub request_method: String,
    pub request_url: String,
    pub user_ip: String,
    pub user_agent: String,
    pub handler: String,
    pub handler_args: Option<String>,
    /// Epoch milliseconds
    pub start_time: i64,
    pub duration: i64,
    pub result_code: i32,
    pub result_msg: String,
    pub result_data: Option<String>,
}

impl From<OperateLog> for OperateLogResponse {
    fn from(log: OperateLog) -> Self {
        Self {
            id: log.id,
            trace_id: log.trace_id,
            user_id: log.user_id,
            user_type: log.user_type,
            module: log.module,
            name: log.name,
            operate_type: log.operate_type,
            content: log.content,
            exts: log.exts,
            request_method: log.request_method,
            request_url: log.request_url,
            user_ip: log.user_ip,
            user_agent: log.user_agent,
            handler: log.handler,
            handler_args: log.handler_args,
            start_time: log.start_time.timestamp_millis(),
            duration: log.duration,
            result_code: log.result_code,
            result_msg: log.result_msg,
            result_data: log.result_data,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OperateLogPageQuery {
    #[serde(default, deserialize_with = "deserialize_u32_opt")]
    pub page_no: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_u32_opt")]
    pub page_size: Option<u32>,
    /// Module contains
    pub module: Option<String>,
    /// Operator username contains
    pub username: Option<String>,
    /// Operate type value
    #[serde(rename = "type")]
    pub operate_type: Option<i32>,
    /// true = result code 0 only, false = failures only
    pub success: Option<bool>,
    /// Lower bound of start time, epoch milliseconds
    pub start_time_from: Option<i64>,
    /// Upper bound of start time, epoch milliseconds
    pub start_time_to: Option<i64>,
}

#[derive(Clone)]
pub struct OperateLogsState {
    pub operate_log_service: OperateLogService,
    pub user_repo: Arc<AdminUserRepository>,
}

/// Page operate logs, newest first
#[utoipa::path(
    get,
    path = "/page",
    tag = "operate-logs",
    operation_id = "getAdminApiSystemOperateLogPage",
    params(OperateLogPageQuery),
    responses(
        (status = 200, description = "One page of operate logs", body = CommonResult<PageResult<OperateLogResponse>>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_operate_log_page(
    State(state): State<OperateLogsState>,
    auth: Authenticated,
    Query(query): Query<OperateLogPageQuery>,
) -> Result<Json<CommonResult<PageResult<OperateLogResponse>>>, PlatformError> {
    require_admin(&auth.0)?;

    let operate_type = match query.operate_type {
        Some(value) => Some(
            OperateType::from_value(value)
                .ok_or_else(|| PlatformError::validation(format!("Unknown operate type {}", value)))?,
        ),
        None => None,
    };

    let mut filter = OperateLogFilter {
        module: query.module,
        user_ids: None,
        operate_type,
        success: query.success,
        start_time_from: query.start_time_from.map(from_millis),
        start_time_to: query.start_time_to.map(from_millis),
    };
    if let Some(username) = query.username.as_deref().filter(|u| !u.is_empty()) {
        let users = state.user_repo.find_by_username_like(username).await?;
        if users.is_empty() {
            return Ok(Json(CommonResult::success(PageResult::empty())));
        }
        filter.user_ids = Some(users.into_iter().map(|u| u.id).collect());
    }

    let page = PageParam::new(query.page_no.unwrap_or(1), query.page_size.unwrap_or(0));
    let result = state.operate_log_service.get_operate_log_page(&filter, &page).await?;

    Ok(Json(CommonResult::success(result.map(OperateLogResponse::from))))
}

/// Get one operate log
#[utoipa::path(
    get,
    path = "/get",
    tag = "operate-logs",
    operation_id = "getAdminApiSystemOperateLogGet",
    params(IdQuery),
    responses(
        (status = 200, description = "Operate log", body = CommonResult<OperateLogResponse>),
        (status = 404, description = "Operate log not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_operate_log(
    State(state): State<OperateLogsState>,
    auth: Authenticated,
    Query(query): Query<IdQuery>,
) -> Result<Json<CommonResult<OperateLogResponse>>, PlatformError> {
    require_admin(&auth.0)?;

    let log = state
        .operate_log_service
        .get_operate_log(query.id)
        .await?
        .ok_or_else(|| PlatformError::not_found("OperateLog", query.id.to_string()))?;

    Ok(Json(CommonResult::success(log.into())))
}

pub fn operate_logs_router(state: OperateLogsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_operate_log_page))
        .routes(routes!(get_operate_log))
        .with_state(state)
}
