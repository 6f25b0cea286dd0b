//! AdminKit Platform
//!
//! Back-office system services:
//! - Operation audit logging for intercepted admin endpoints
//! - Token login sessions backed by a cache and a relational table
//! - Login logs, including timeout and forced logouts
//! - Admin authentication with Argon2 password hashes
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `service` - Business operations
//! - `api` - REST endpoints

// Aggregates
pub mod login_log;
pub mod operate_log;
pub mod session;
pub mod user;

// Authentication
pub mod auth;

// Shared infrastructure
pub mod shared;

// Cross-cutting concerns
pub mod platform;
pub mod seed;

pub use shared::error::{PlatformError, Result};
pub use platform::{init_schema, Platform};

// Re-export main types for convenience
pub use login_log::{LoginLog, LoginLogCreate, LoginLogService, LoginLogType, LoginResult};
pub use operate_log::{
    EndpointDescriptor, OperateLog, OperateLogContext, OperateLogCreate, OperateLogInterceptor,
    OperateLogOptions, OperateLogRecorder, OperateLogService, OperateType,
};
pub use session::{
    InMemoryLoginUserCache, LoginUser, LoginUserCache, RedisLoginUserCache, SessionTimeoutSweeper,
    UserSession, UserSessionService,
};
pub use user::{AdminUser, AdminUserRepository, UserStatus};
