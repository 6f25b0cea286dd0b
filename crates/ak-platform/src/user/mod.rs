//! Admin User Aggregate
//!
//! Back-office accounts that can log in and own sessions.

pub mod entity;
pub mod repository;

pub use entity::{AdminUser, UserStatus};
pub use repository::AdminUserRepository;
