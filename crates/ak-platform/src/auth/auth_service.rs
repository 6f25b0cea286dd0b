//! Admin Authentication Service
//!
//! Username/password login and logout for back-office accounts. Every
//! attempt, successful or not, leaves a login log entry.

use std::sync::Arc;

use ak_common::UserType;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::auth::password_service::PasswordService;
use crate::login_log::{LoginLogCreate, LoginLogService, LoginLogType, LoginResult};
use crate::session::{LoginUser, UserSessionService};
use crate::shared::error::{PlatformError, Result};
use crate::shared::request_info::ClientInfo;
use crate::user::AdminUserRepository;

/// Issued token for a successful login
#[derive(Debug, Clone, PartialEq)]
pub struct LoginGrant {
    pub user_id: i64,
    pub access_token: String,
    pub expires_time: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AdminAuthService {
    users: Arc<AdminUserRepository>,
    passwords: Arc<PasswordService>,
    sessions: UserSessionService,
    login_logs: LoginLogService,
}

impl AdminAuthService {
    pub fn new(
        users: Arc<AdminUserRepository>,
        passwords: Arc<PasswordService>,
        sessions: UserSessionService,
        login_logs: LoginLogService,
    ) -> Self {
        Self {
            users,
            passwords,
            sessions,
            login_logs,
        }
    }

    pub async fn login(&self, username: &str, password: &str, client: &ClientInfo) -> Result<LoginGrant> {
        let Some(user) = self.users.find_by_username(username).await? else {
            self.record_login(None, username, LoginResult::BadCredentials, client).await?;
            return Err(PlatformError::InvalidCredentials);
        };

        if !self.passwords.verify_password(password, &user.password)? {
            self.record_login(Some(user.id), username, LoginResult::BadCredentials, client)
                .await?;
            return Err(PlatformError::InvalidCredentials);
        }

        if !user.is_enabled() {
            self.record_login(Some(user.id), username, LoginResult::UserDisabled, client)
                .await?;
            return Err(PlatformError::UserDisabled);
        }

        let login_user = LoginUser::new(user.id, UserType::Admin)
            .with_username(user.username.clone())
            .with_tenant(user.tenant_id);
        let access_token = self
            .sessions
            .create_user_session(&login_user, &client.user_ip, &client.user_agent)
            .await?;
        self.record_login(Some(user.id), username, LoginResult::Success, client)
            .await?;

        info!(user_id = user.id, "Admin logged in");
        Ok(LoginGrant {
            user_id: user.id,
            access_token,
            expires_time: Utc::now()
                + chrono::Duration::milliseconds(self.sessions.timeout().as_millis() as i64),
        })
    }

    /// End the session behind `token`. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str, client: &ClientInfo) -> Result<()> {
        let login_user = self.sessions.get_login_user(token).await?;
        self.sessions.delete_user_session(token).await?;

        let Some(login_user) = login_user else {
            warn!("Logout with unknown token");
            return Ok(());
        };

        let log = LoginLogCreate::new(LoginLogType::LogoutSelf, login_user.user_type, LoginResult::Success)
            .with_user(login_user.id, login_user.username.clone())
            .with_client(client.user_ip.clone(), client.user_agent.clone())
            .with_trace_id(client.trace_id.clone());
        self.login_logs.create_login_log(log).await?;

        info!(user_id = login_user.id, "Admin logged out");
        Ok(())
    }

    async fn record_login(
        &self,
        user_id: Option<i64>,
        username: &str,
        result: LoginResult,
        client: &ClientInfo,
    ) -> Result<()> {
        let mut log = LoginLogCreate::new(LoginLogType::LoginUsername, UserType::Admin, result)
            .with_client(client.user_ip.clone(), client.user_agent.clone())
            .with_trace_id(client.trace_id.clone());
        log.user_id = user_id;
        log.username = username.to_string();
        self.login_logs.create_login_log(log).await?;
        Ok(())
    }
}
