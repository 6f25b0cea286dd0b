//! Platform Error Types

use ak_common::{error_codes, CommonResult};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authorization error: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User is disabled")]
    UserDisabled,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// HTTP status and envelope code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            PlatformError::NotFound { .. } => StatusCode::NOT_FOUND,
            PlatformError::Validation { .. } => StatusCode::BAD_REQUEST,
            PlatformError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            PlatformError::Forbidden { .. } => StatusCode::FORBIDDEN,
            PlatformError::InvalidCredentials => StatusCode::BAD_REQUEST,
            PlatformError::UserDisabled => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match status {
            // Internal details stay in the server log
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "Request failed");
                error_codes::INTERNAL_SERVER_ERROR.msg.to_string()
            }
            _ => self.to_string(),
        };

        let body: CommonResult<()> = CommonResult::error(i32::from(status.as_u16()), msg);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PlatformError::not_found("UserSession", "1").status(), StatusCode::NOT_FOUND);
        assert_eq!(PlatformError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(PlatformError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(PlatformError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_is_envelope() {
        let response = PlatformError::forbidden("admins only").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
