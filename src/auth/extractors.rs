use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts},
    http::request::Parts,
    Json,
};
use tracing::warn;

use super::{jwt::JwtKeys, repo_types::User};
use crate::{error::AppError, state::AppState};

/// `Json` whose rejections use the same error envelope as every other failure.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// The authenticated user behind a bearer token.
///
/// Rejects before the handler runs when the header is absent, the token
/// does not verify, or its subject no longer exists.
pub struct CurrentUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".into()))?;

    // Expect "Bearer <token>"
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let user_id = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "bearer token rejected");
            AppError::from(e)
        })?;

        let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
            warn!(user_id = %user_id, "token subject no longer exists");
            AppError::Unauthorized("Not authorized".into())
        })?;

        Ok(CurrentUser(user))
    }
}
