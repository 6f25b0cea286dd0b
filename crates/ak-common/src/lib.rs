//! AdminKit common types
//!
//! Wire-level types shared by every AdminKit crate:
//! - `CommonResult` response envelope and global error codes
//! - `PageResult` for paged queries
//! - `UserType` of an authenticated principal

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod logging;

// ============================================================================
// Principal types
// ============================================================================

/// Kind of principal a session or log entry belongs to.
///
/// Stored and serialized as its integer value (`1` member, `2` admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum UserType {
    /// End-user of the storefront/app side
    Member,
    /// Back-office administrator
    Admin,
}

impl UserType {
    pub fn value(self) -> i32 {
        match self {
            UserType::Member => 1,
            UserType::Admin => 2,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(UserType::Member),
            2 => Some(UserType::Admin),
            _ => None,
        }
    }

    pub fn values() -> [UserType; 2] {
        [UserType::Member, UserType::Admin]
    }
}

impl From<UserType> for i32 {
    fn from(value: UserType) -> Self {
        value.value()
    }
}

impl TryFrom<i32> for UserType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        UserType::from_value(value).ok_or_else(|| format!("unknown user type: {}", value))
    }
}

// ============================================================================
// Error codes
// ============================================================================

/// A numeric result code paired with its default message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: i32,
    pub msg: &'static str,
}

impl ErrorCode {
    pub const fn new(code: i32, msg: &'static str) -> Self {
        Self { code, msg }
    }
}

/// Global result codes carried in `CommonResult::code`.
pub mod error_codes {
    use super::ErrorCode;

    pub const SUCCESS: ErrorCode = ErrorCode::new(0, "");
    pub const BAD_REQUEST: ErrorCode = ErrorCode::new(400, "Bad request parameters");
    pub const UNAUTHORIZED: ErrorCode = ErrorCode::new(401, "Account not logged in");
    pub const FORBIDDEN: ErrorCode = ErrorCode::new(403, "No permission for this operation");
    pub const NOT_FOUND: ErrorCode = ErrorCode::new(404, "Requested resource not found");
    pub const INTERNAL_SERVER_ERROR: ErrorCode = ErrorCode::new(500, "Internal server error");
}

// ============================================================================
// Response envelope
// ============================================================================

/// Standard response envelope for every admin API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommonResult<T> {
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> CommonResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS.code,
            msg: String::new(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn from_error_code(error: ErrorCode) -> Self {
        Self::error(error.code, error.msg)
    }

    pub fn is_success(&self) -> bool {
        self.code == error_codes::SUCCESS.code
    }
}

// ============================================================================
// Paging
// ============================================================================

/// One page of a paged query plus the unpaged total.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PageResult<T> {
    pub list: Vec<T>,
    pub total: i64,
}

impl<T> PageResult<T> {
    pub fn new(list: Vec<T>, total: i64) -> Self {
        Self { list, total }
    }

    pub fn empty() -> Self {
        Self {
            list: Vec::new(),
            total: 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            list: self.list.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}
