//! Login Session Entities

use ak_common::UserType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::shared::api_common::{deserialize_u32_opt, PageParam};

/// Authenticated principal as stored in the session cache.
///
/// Resolved from the bearer token on every request and placed into the
/// request extensions by the token authentication layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    /// User id
    pub id: i64,
    pub user_type: UserType,
    #[serde(default)]
    pub tenant_id: i64,
    #[serde(default)]
    pub username: String,
    /// Last time the session was created or refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    /// When the session expires unless refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_time: Option<DateTime<Utc>>,
}

impl LoginUser {
    pub fn new(id: i64, user_type: UserType) -> Self {
        Self {
            id,
            user_type,
            tenant_id: 0,
            username: String::new(),
            update_time: None,
            expires_time: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_tenant(mut self, tenant_id: i64) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }
}

/// Relational record of one login session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub user_type: UserType,
    pub tenant_id: i64,
    pub username: String,
    pub user_ip: String,
    pub user_agent: String,
    /// Expiry; the sweeper deletes the record once this has passed
    pub session_timeout: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl UserSession {
    /// Build the record for a freshly issued token
    pub fn for_login(
        token: impl Into<String>,
        login_user: &LoginUser,
        user_ip: impl Into<String>,
        user_agent: impl Into<String>,
        session_timeout: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            token: token.into(),
            user_id: login_user.id,
            user_type: login_user.user_type,
            tenant_id: login_user.tenant_id,
            username: login_user.username.clone(),
            user_ip: user_ip.into(),
            user_agent: user_agent.into(),
            session_timeout,
            create_time: now,
            update_time: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.session_timeout < now
    }
}

/// Filters for the session page query
#[derive(Debug, Clone, Default)]
pub struct UserSessionFilter {
    /// Restrict to these user ids (`None` = no restriction)
    pub user_ids: Option<Vec<i64>>,
    /// Substring match on the client IP
    pub user_ip: Option<String>,
}

/// Session page request (`pageNo` is 1-based)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserSessionPageReq {
    /// Username contains; matched against admin accounts
    pub username: Option<String>,
    /// Client IP contains
    pub user_ip: Option<String>,
    #[serde(default, deserialize_with = "deserialize_u32_opt")]
    pub page_no: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_u32_opt")]
    pub page_size: Option<u32>,
}

impl UserSessionPageReq {
    pub fn page(&self) -> PageParam {
        PageParam::new(self.page_no.unwrap_or(1), self.page_size.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_login_user_serializes_camel_case() {
        let user = LoginUser::new(7, UserType::Admin).with_username("admin");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userType"], 2);
        assert_eq!(json["username"], "admin");
        assert!(json.get("expiresTime").is_none());
        assert!(user.is_admin());
    }

    #[test]
    fn test_session_expiry_check() {
        let user = LoginUser::new(1, UserType::Member);
        let now = Utc::now();
        let session = UserSession::for_login("t", &user, "127.0.0.1", "ua", now - Duration::seconds(1));
        assert!(session.is_expired_at(now));
        assert!(!session.is_expired_at(now - Duration::minutes(1)));
        assert_eq!(session.user_id, 1);
    }
}
