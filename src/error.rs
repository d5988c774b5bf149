use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::jwt::TokenError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Wrong credentials supplied in a request body.
    #[error("{0}")]
    Auth(String),

    /// Missing or unusable bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// Request body that is not acceptable JSON for the endpoint.
    #[error(transparent)]
    Body(#[from] JsonRejection),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Email could not be sent")]
    EmailDelivery(#[source] anyhow::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::Auth(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Body(rejection) => rejection.status(),
            AppError::Unauthorized(_) | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AppError::EmailDelivery(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Internal(e) | AppError::EmailDelivery(e) = &self {
            tracing::error!(error = %e, "request failed");
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<TokenError> for AppError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Expired => AppError::ExpiredToken,
            TokenError::Invalid => AppError::Unauthorized("Invalid token".into()),
            TokenError::Signing(e) => AppError::Internal(e.into()),
        }
    }
}
