//! Authentication
//!
//! Password hashing, admin login/logout and the auth endpoints.

pub mod auth_api;
pub mod auth_service;
pub mod password_service;

pub use auth_api::{auth_router, AuthApiState};
pub use auth_service::{AdminAuthService, LoginGrant};
pub use password_service::{Argon2Config, PasswordService};
