//! Login Log Aggregate
//!
//! Append-only record of logins and logouts, including timeout evictions.

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use api::{login_logs_router, LoginLogsState};
pub use entity::{LoginLog, LoginLogCreate, LoginLogFilter, LoginLogType, LoginResult};
pub use repository::LoginLogRepository;
pub use service::LoginLogService;
