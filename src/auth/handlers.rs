use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        credentials::CredentialStore,
        dto::{
            AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
            LogoutResponse, MessageResponse, RegisterRequest, ResetPasswordRequest,
            UpdateProfileRequest, UserResponse, UsersResponse,
        },
        extractors::{CurrentUser, JsonBody},
        services::AuthService,
    },
    error::Result,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register).get(list_users))
        .route("/users/login", post(login))
        .route("/users/forgot-password", post(forgot_password))
        .route("/users/reset-password/:token", post(reset_password))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(get_profile))
        .route("/users/profile/update", put(update_profile))
        .route("/users/profile/delete", delete(delete_profile))
        .route("/users/profile/logout", get(logout))
        .route("/users/profile/change-password", put(change_password))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<AuthService>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (user, token) = auth.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user,
            token,
        }),
    ))
}

#[instrument(skip(credentials))]
pub async fn list_users(State(credentials): State<CredentialStore>) -> Result<Json<UsersResponse>> {
    let users = credentials.list().await?;
    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

#[instrument(skip(auth, payload))]
pub async fn login(
    State(auth): State<AuthService>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let (user, token) = auth.login(payload).await?;
    Ok(Json(AuthResponse {
        success: true,
        user,
        token,
    }))
}

#[instrument(skip_all)]
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        success: true,
        user: user.into(),
    })
}

#[instrument(skip_all)]
pub async fn update_profile(
    State(credentials): State<CredentialStore>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    let user = credentials
        .update_profile(user.id, payload.name.as_deref(), payload.email.as_deref())
        .await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip_all)]
pub async fn delete_profile(
    State(credentials): State<CredentialStore>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MessageResponse>> {
    credentials.delete_user(user.id).await?;
    Ok(Json(MessageResponse::ok("User removed successfully")))
}

#[instrument(skip_all)]
pub async fn logout(
    State(auth): State<AuthService>,
    CurrentUser(user): CurrentUser,
) -> Json<LogoutResponse> {
    auth.logout(user.id);
    Json(LogoutResponse {
        success: true,
        message: "User logged out successfully",
        token: None,
    })
}

#[instrument(skip_all)]
pub async fn change_password(
    State(auth): State<AuthService>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    auth.change_password(user.id, payload).await?;
    Ok(Json(MessageResponse::ok("Password changed successfully")))
}

#[instrument(skip_all)]
pub async fn forgot_password(
    State(auth): State<AuthService>,
    JsonBody(payload): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    auth.forgot_password(payload).await?;
    Ok(Json(MessageResponse::ok("Email sent successfully")))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(auth): State<AuthService>,
    Path(token): Path<String>,
    JsonBody(payload): JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    auth.reset_password(&token, payload).await?;
    Ok(Json(MessageResponse::ok("Password changed successfully")))
}
