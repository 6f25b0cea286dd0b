//! Platform assembly
//!
//! Builds repositories and services over one pool and session cache, and
//! exposes the admin API router with its OpenAPI document.

use std::sync::Arc;
use std::time::Duration;

use ak_config::AppConfig;
use axum::Router;
use sqlx::SqlitePool;
use utoipa::openapi::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::auth::{auth_router, AdminAuthService, AuthApiState, PasswordService};
use crate::login_log::{login_logs_router, LoginLogRepository, LoginLogService, LoginLogsState};
use crate::operate_log::{
    operate_logs_router, OperateLogInterceptor, OperateLogRepository, OperateLogService,
    OperateLogsState,
};
use crate::seed::DevDataSeeder;
use crate::session::{
    user_sessions_router, LoginUserCache, SessionTimeoutSweeper, UserSessionRepository,
    UserSessionService, UserSessionsState,
};
use crate::shared::error::Result;
use crate::user::AdminUserRepository;

/// Create every table and index the platform uses. Idempotent.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    AdminUserRepository::new(pool.clone()).create_schema().await?;
    UserSessionRepository::new(pool.clone()).create_schema().await?;
    LoginLogRepository::new(pool.clone()).create_schema().await?;
    OperateLogRepository::new(pool.clone()).create_schema().await?;
    Ok(())
}

#[derive(Clone)]
pub struct Platform {
    pub pool: SqlitePool,
    pub user_repo: Arc<AdminUserRepository>,
    pub passwords: Arc<PasswordService>,
    pub session_service: UserSessionService,
    pub login_log_service: LoginLogService,
    pub operate_log_service: OperateLogService,
    pub auth_service: AdminAuthService,
    pub oplog: OperateLogInterceptor,
}

impl Platform {
    pub fn new(
        pool: SqlitePool,
        cache: Arc<dyn LoginUserCache>,
        config: &AppConfig,
        passwords: Arc<PasswordService>,
    ) -> Self {
        let user_repo = Arc::new(AdminUserRepository::new(pool.clone()));
        let login_log_service =
            LoginLogService::new(Arc::new(LoginLogRepository::new(pool.clone())));
        let operate_log_service =
            OperateLogService::new(Arc::new(OperateLogRepository::new(pool.clone())));

        let session_service = UserSessionService::new(
            Arc::new(UserSessionRepository::new(pool.clone())),
            cache,
            user_repo.clone(),
            login_log_service.clone(),
            config.session.timeout(),
        );
        let auth_service = AdminAuthService::new(
            user_repo.clone(),
            passwords.clone(),
            session_service.clone(),
            login_log_service.clone(),
        );
        let oplog = OperateLogInterceptor::new(Arc::new(operate_log_service.clone()))
            .with_enabled(config.operate_log.enabled)
            .with_max_body_bytes(config.operate_log.max_request_body_bytes);

        Self {
            pool,
            user_repo,
            passwords,
            session_service,
            login_log_service,
            operate_log_service,
            auth_service,
            oplog,
        }
    }

    /// Admin APIs plus the OpenAPI document collected from them
    pub fn api_router(&self) -> (Router, OpenApi) {
        let (router, mut openapi) = OpenApiRouter::new()
            .nest(
                "/admin-api/system/auth",
                auth_router(
                    AuthApiState {
                        auth_service: self.auth_service.clone(),
                    },
                    &self.oplog,
                ),
            )
            .nest(
                "/admin-api/system/user-session",
                user_sessions_router(
                    UserSessionsState {
                        session_service: self.session_service.clone(),
                    },
                    &self.oplog,
                ),
            )
            .nest(
                "/admin-api/system/login-log",
                login_logs_router(LoginLogsState {
                    login_log_service: self.login_log_service.clone(),
                }),
            )
            .nest(
                "/admin-api/system/operate-log",
                operate_logs_router(OperateLogsState {
                    operate_log_service: self.operate_log_service.clone(),
                    user_repo: self.user_repo.clone(),
                }),
            )
            .split_for_parts();

        openapi.info.title = "AdminKit System API".to_string();
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
        openapi.info.description =
            Some("Sessions, login logs and operation audit logs".to_string());

        (router, openapi)
    }

    pub fn sweeper(&self, sweep_interval: Duration) -> SessionTimeoutSweeper {
        SessionTimeoutSweeper::new(self.session_service.clone(), sweep_interval)
    }

    pub fn dev_seeder(&self) -> DevDataSeeder {
        DevDataSeeder::new(self.user_repo.clone(), self.passwords.clone())
    }
}
