//! User Session Service
//!
//! Issues and tracks login tokens. Every session lives twice: as a cached
//! `LoginUser` used to authenticate requests and as a relational record used
//! for listing, administrative kick-out and the timeout sweep.

use std::sync::Arc;
use std::time::Duration;

use ak_common::PageResult;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::login_log::{LoginLogCreate, LoginLogService, LoginLogType, LoginResult};
use crate::session::cache::LoginUserCache;
use crate::session::entity::{LoginUser, UserSession, UserSessionFilter, UserSessionPageReq};
use crate::session::repository::UserSessionRepository;
use crate::shared::error::{PlatformError, Result};
use crate::user::AdminUserRepository;

#[derive(Clone)]
pub struct UserSessionService {
    repo: Arc<UserSessionRepository>,
    cache: Arc<dyn LoginUserCache>,
    users: Arc<AdminUserRepository>,
    login_logs: LoginLogService,
    timeout: Duration,
}

impl UserSessionService {
    pub fn new(
        repo: Arc<UserSessionRepository>,
        cache: Arc<dyn LoginUserCache>,
        users: Arc<AdminUserRepository>,
        login_logs: LoginLogService,
        timeout: Duration,
    ) -> Self {
        Self {
            repo,
            cache,
            users,
            login_logs,
            timeout,
        }
    }

    /// Configured session lifetime
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::milliseconds(self.timeout.as_millis() as i64)
    }

    /// Issue a token for `login_user` and store the session in both stores
    pub async fn create_user_session(
        &self,
        login_user: &LoginUser,
        user_ip: &str,
        user_agent: &str,
    ) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let expires = self.expires_at(now);

        let mut cached = login_user.clone();
        cached.update_time = Some(now);
        cached.expires_time = Some(expires);
        self.cache.set(&token, &cached, self.timeout).await?;

        let session = UserSession::for_login(token.clone(), login_user, user_ip, user_agent, expires);
        let id = self.repo.insert(&session).await?;

        info!(
            session_id = id,
            user_id = login_user.id,
            user_type = login_user.user_type.value(),
            "Created user session"
        );
        Ok(token)
    }

    /// Whether a verified session is old enough to have its expiry pushed forward.
    /// Sessions are refreshed once a third of the timeout has passed since the last refresh.
    pub fn needs_refresh(&self, login_user: &LoginUser, now: DateTime<Utc>) -> bool {
        let Some(updated) = login_user.update_time else {
            return true;
        };
        let threshold = chrono::Duration::milliseconds((self.timeout.as_millis() / 3) as i64);
        now - updated >= threshold
    }

    /// Push the expiry of an existing session forward, returning the cached user
    pub async fn refresh_user_session(&self, token: &str, login_user: &LoginUser) -> Result<LoginUser> {
        let now = Utc::now();
        let expires = self.expires_at(now);

        let mut cached = login_user.clone();
        cached.update_time = Some(now);
        cached.expires_time = Some(expires);
        self.cache.set(token, &cached, self.timeout).await?;

        let updated = self
            .repo
            .update_by_token(token, expires, &login_user.username, now)
            .await?;
        if !updated {
            warn!(user_id = login_user.id, "Refreshed a session with no stored record");
        }
        Ok(cached)
    }

    /// Remove the session identified by `token` from both stores
    pub async fn delete_user_session(&self, token: &str) -> Result<()> {
        self.cache.delete(token).await?;
        let deleted = self.repo.delete_by_token(token).await?;
        debug!(deleted, "Deleted user session by token");
        Ok(())
    }

    /// Remove the session with record id `id` from both stores and record
    /// the forced logout
    pub async fn delete_user_session_by_id(&self, id: i64) -> Result<()> {
        let session = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("UserSession", id.to_string()))?;

        self.cache.delete(&session.token).await?;
        self.repo.delete_by_id(id).await?;

        let log = LoginLogCreate::new(LoginLogType::LogoutDelete, session.user_type, LoginResult::Success)
            .with_user(session.user_id, session.username.clone())
            .with_client(session.user_ip.clone(), session.user_agent.clone());
        self.login_logs.create_login_log(log).await?;

        info!(session_id = id, user_id = session.user_id, "Deleted user session");
        Ok(())
    }

    pub async fn get_login_user(&self, token: &str) -> Result<Option<LoginUser>> {
        self.cache.get(token).await
    }

    pub async fn get_user_session(&self, id: i64) -> Result<Option<UserSession>> {
        self.repo.find_by_id(id).await
    }

    pub async fn get_user_session_page(
        &self,
        req: &UserSessionPageReq,
    ) -> Result<PageResult<UserSession>> {
        let mut filter = UserSessionFilter {
            user_ids: None,
            user_ip: req.user_ip.clone(),
        };

        if let Some(username) = req.username.as_deref().filter(|u| !u.is_empty()) {
            let users = self.users.find_by_username_like(username).await?;
            if users.is_empty() {
                return Ok(PageResult::empty());
            }
            filter.user_ids = Some(users.into_iter().map(|u| u.id).collect());
        }

        let (list, total) = self.repo.find_page(&filter, &req.page()).await?;
        Ok(PageResult::new(list, total))
    }

    /// Delete every session whose expiry has passed, writing a timeout
    /// logout entry for each. Returns the number of sessions removed.
    pub async fn delete_timeout_sessions(&self) -> Result<u64> {
        if let Err(e) = self.cache.purge_expired().await {
            warn!(error = %e, "Failed to purge expired login users");
        }

        let expired = self.repo.find_expired(Utc::now()).await?;
        if expired.is_empty() {
            return Ok(0);
        }

        let mut count = 0u64;
        for session in expired {
            if !self.repo.delete_by_id(session.id).await? {
                continue;
            }
            count += 1;

            let log = LoginLogCreate::new(
                LoginLogType::LogoutTimeout,
                session.user_type,
                LoginResult::Success,
            )
            .with_user(session.user_id, session.username.clone())
            .with_client(session.user_ip.clone(), session.user_agent.clone());
            if let Err(e) = self.login_logs.create_login_log(log).await {
                error!(
                    session_id = session.id,
                    user_id = session.user_id,
                    error = %e,
                    "Failed to record session timeout"
                );
            }
        }

        info!(count, "Deleted timed out user sessions");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login_log::LoginLogRepository;
    use crate::session::cache::InMemoryLoginUserCache;
    use crate::shared::db::connect_in_memory;
    use ak_common::UserType;

    async fn service() -> (UserSessionService, Arc<InMemoryLoginUserCache>) {
        let pool = connect_in_memory().await.unwrap();
        let repo = Arc::new(UserSessionRepository::new(pool.clone()));
        repo.create_schema().await.unwrap();
        let users = Arc::new(AdminUserRepository::new(pool.clone()));
        users.create_schema().await.unwrap();
        let log_repo = Arc::new(LoginLogRepository::new(pool));
        log_repo.create_schema().await.unwrap();

        let cache = Arc::new(InMemoryLoginUserCache::new());
        let service = UserSessionService::new(
            repo,
            cache.clone(),
            users,
            LoginLogService::new(log_repo),
            Duration::from_secs(3600),
        );
        (service, cache)
    }

    #[tokio::test]
    async fn test_create_then_delete_by_token() {
        let (service, cache) = service().await;
        let user = LoginUser::new(5, UserType::Admin).with_username("admin");

        let token = service.create_user_session(&user, "127.0.0.1", "ua").await.unwrap();
        assert_eq!(token.len(), 32);

        let cached = service.get_login_user(&token).await.unwrap().unwrap();
        assert_eq!(cached.id, 5);
        assert!(cached.expires_time.is_some());

        service.delete_user_session(&token).await.unwrap();
        assert!(cache.is_empty());
        let page = service
            .get_user_session_page(&UserSessionPageReq::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_needs_refresh_after_a_third_of_the_timeout() {
        let (service, _) = service().await;
        let now = Utc::now();
        let mut user = LoginUser::new(1, UserType::Admin);
        assert!(service.needs_refresh(&user, now));

        user.update_time = Some(now - chrono::Duration::minutes(10));
        assert!(!service.needs_refresh(&user, now));

        user.update_time = Some(now - chrono::Duration::minutes(20));
        assert!(service.needs_refresh(&user, now));
    }

    #[tokio::test]
    async fn test_delete_by_id_missing_is_not_found() {
        let (service, _) = service().await;
        let err = service.delete_user_session_by_id(99).await.unwrap_err();
        assert!(matches!(err, PlatformError::NotFound { .. }));
    }
}
