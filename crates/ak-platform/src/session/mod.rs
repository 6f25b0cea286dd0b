//! User Session Aggregate
//!
//! Token sessions kept in a login-user cache and a relational table, plus
//! the sweeper that evicts expired records.

pub mod api;
pub mod cache;
pub mod entity;
pub mod repository;
pub mod service;
pub mod sweeper;

pub use api::{user_sessions_router, UserSessionsState};
pub use cache::{InMemoryLoginUserCache, LoginUserCache, RedisLoginUserCache};
pub use entity::{LoginUser, UserSession, UserSessionFilter, UserSessionPageReq};
pub use repository::UserSessionRepository;
pub use service::UserSessionService;
pub use sweeper::SessionTimeoutSweeper;
