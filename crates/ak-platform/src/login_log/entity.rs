//! Login Log Entity

use ak_common::UserType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to the session: a login or one of the logout causes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum LoginLogType {
    /// Username/password login
    LoginUsername,
    /// User logged out
    LogoutSelf,
    /// Session expired and was swept
    LogoutTimeout,
    /// Session removed by an administrator
    LogoutDelete,
}

impl LoginLogType {
    pub fn value(self) -> i32 {
        match self {
            LoginLogType::LoginUsername => 100,
            LoginLogType::LogoutSelf => 200,
            LoginLogType::LogoutTimeout => 201,
            LoginLogType::LogoutDelete => 202,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            100 => Some(LoginLogType::LoginUsername),
            200 => Some(LoginLogType::LogoutSelf),
            201 => Some(LoginLogType::LogoutTimeout),
            202 => Some(LoginLogType::LogoutDelete),
            _ => None,
        }
    }
}

impl From<LoginLogType> for i32 {
    fn from(value: LoginLogType) -> Self {
        value.value()
    }
}

impl TryFrom<i32> for LoginLogType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        LoginLogType::from_value(value).ok_or_else(|| format!("unknown login log type: {}", value))
    }
}

/// Outcome of the login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum LoginResult {
    Success,
    BadCredentials,
    UserDisabled,
    Unknown,
}

impl LoginResult {
    pub fn value(self) -> i32 {
        match self {
            LoginResult::Success => 0,
            LoginResult::BadCredentials => 10,
            LoginResult::UserDisabled => 20,
            LoginResult::Unknown => 100,
        }
    }

    /// Unrecognised values read back as `Unknown`
    pub fn from_value(value: i32) -> Self {
        match value {
            0 => LoginResult::Success,
            10 => LoginResult::BadCredentials,
            20 => LoginResult::UserDisabled,
            _ => LoginResult::Unknown,
        }
    }
}

impl From<LoginResult> for i32 {
    fn from(value: LoginResult) -> Self {
        value.value()
    }
}

impl TryFrom<i32> for LoginResult {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(LoginResult::from_value(value))
    }
}

/// Input for a new login log entry
#[derive(Debug, Clone, PartialEq)]
pub struct LoginLogCreate {
    pub log_type: LoginLogType,
    pub trace_id: String,
    pub user_id: Option<i64>,
    pub user_type: UserType,
    pub username: String,
    pub result: LoginResult,
    pub user_ip: String,
    pub user_agent: String,
}

impl LoginLogCreate {
    pub fn new(log_type: LoginLogType, user_type: UserType, result: LoginResult) -> Self {
        Self {
            log_type,
            trace_id: String::new(),
            user_id: None,
            user_type,
            username: String::new(),
            result,
            user_ip: String::new(),
            user_agent: String::new(),
        }
    }

    pub fn with_user(mut self, user_id: i64, username: impl Into<String>) -> Self {
        self.user_id = Some(user_id);
        self.username = username.into();
        self
    }

    pub fn with_client(mut self, user_ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.user_ip = user_ip.into();
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }
}

/// Persisted login log entry
#[derive(Debug, Clone, PartialEq)]
pub struct LoginLog {
    pub id: i64,
    pub log_type: LoginLogType,
    pub trace_id: String,
    pub user_id: Option<i64>,
    pub user_type: UserType,
    pub username: String,
    pub result: LoginResult,
    pub user_ip: String,
    pub user_agent: String,
    pub create_time: DateTime<Utc>,
}

/// Filters for the login log page query
#[derive(Debug, Clone, Default)]
pub struct LoginLogFilter {
    pub user_ip: Option<String>,
    pub username: Option<String>,
    /// `Some(true)` only successes, `Some(false)` only failures
    pub success: Option<bool>,
}
