//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod api_common;
pub mod db;
pub mod error;
pub mod health_api;
pub mod middleware;
pub mod request_info;

pub use api_common::{IdQuery, PageParam};
pub use error::{PlatformError, Result};
pub use health_api::health_router;
pub use middleware::{Authenticated, TokenAuthLayer};
pub use request_info::ClientInfo;
