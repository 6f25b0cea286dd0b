//! Admin User Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum UserStatus {
    Enabled,
    Disabled,
}

impl UserStatus {
    pub fn value(self) -> i32 {
        match self {
            UserStatus::Enabled => 0,
            UserStatus::Disabled => 1,
        }
    }

    pub fn from_value(value: i32) -> Self {
        if value == 0 {
            UserStatus::Enabled
        } else {
            UserStatus::Disabled
        }
    }
}

impl From<UserStatus> for i32 {
    fn from(status: UserStatus) -> Self {
        status.value()
    }
}

impl TryFrom<i32> for UserStatus {
    type Error = std::convert::Infallible;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(UserStatus::from_value(value))
    }
}

/// Back-office account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password: String,
    pub status: UserStatus,
    pub tenant_id: i64,
    pub create_time: DateTime<Utc>,
}

impl AdminUser {
    /// New, not yet persisted account (`id` is assigned on insert)
    pub fn new(username: impl Into<String>, nickname: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            nickname: nickname.into(),
            password: password_hash.into(),
            status: UserStatus::Enabled,
            tenant_id: 0,
            create_time: Utc::now(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: i64) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.status == UserStatus::Enabled
    }
}
