use axum::extract::FromRef;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        credentials::{non_empty, CredentialStore},
        dto::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, PublicUser,
            RegisterRequest, ResetPasswordRequest,
        },
        jwt::JwtKeys,
        reset::ResetTokens,
    },
    error::{AppError, Result},
    state::AppState,
};

fn all_fields<const N: usize>(fields: [Option<&str>; N]) -> Result<[&str; N]> {
    let mut out = [""; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = non_empty(field)
            .ok_or_else(|| AppError::Validation("Please enter all fields".into()))?;
    }
    Ok(out)
}

/// Sequences the user-facing account flows. Holds no state of its own.
#[derive(Clone)]
pub struct AuthService {
    credentials: CredentialStore,
    keys: JwtKeys,
    resets: ResetTokens,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self {
            credentials: CredentialStore::from_ref(state),
            keys: JwtKeys::from_ref(state),
            resets: ResetTokens::from_ref(state),
        }
    }
}

impl AuthService {
    #[instrument(skip(self, req))]
    pub async fn register(&self, req: RegisterRequest) -> Result<(PublicUser, String)> {
        let [name, email, password] = all_fields([
            req.name.as_deref(),
            req.email.as_deref(),
            req.password.as_deref(),
        ])?;
        let user = self.credentials.create_user(name, email, password).await?;
        let token = self.keys.issue(user.id)?;
        info!(user_id = %user.id, "user registered");
        Ok((user, token))
    }

    #[instrument(skip(self, req))]
    pub async fn login(&self, req: LoginRequest) -> Result<(PublicUser, String)> {
        let [email, password] = all_fields([req.email.as_deref(), req.password.as_deref()])?;
        let user = self.credentials.find_by_email(email).await?;

        if !self.credentials.verify_password(&user, password) {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::Auth("Invalid credentials".into()));
        }

        let token = self.keys.issue(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok((user.into(), token))
    }

    /// Sessions are stateless; the client discards its token.
    pub fn logout(&self, user_id: Uuid) {
        info!(user_id = %user_id, "user logged out");
    }

    pub async fn change_password(&self, user_id: Uuid, req: ChangePasswordRequest) -> Result<()> {
        let [old, new] = all_fields([req.old_password.as_deref(), req.new_password.as_deref()])?;
        self.credentials.change_password(user_id, old, new).await
    }

    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> Result<()> {
        let email = non_empty(req.email.as_deref())
            .ok_or_else(|| AppError::Validation("Email is required".into()))?;
        self.resets.request_reset(email).await
    }

    pub async fn reset_password(&self, raw_token: &str, req: ResetPasswordRequest) -> Result<()> {
        self.resets
            .consume_reset(raw_token, req.password.as_deref().unwrap_or_default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::from_ref(&AppState::fake())
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some("A".into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn register_issues_a_verifiable_token() {
        let svc = service();
        let (user, token) = svc.register(register_req("a@x.com", "longpass1")).await.unwrap();
        assert_eq!(svc.keys.verify(&token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn register_missing_field() {
        let svc = service();
        let err = svc
            .register(RegisterRequest {
                name: None,
                ..register_req("a@x.com", "longpass1")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn login_flows() {
        let svc = service();
        svc.register(register_req("a@x.com", "longpass1")).await.unwrap();

        let err = svc.login(login_req("nobody@x.com", "longpass1")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = svc.login(login_req("a@x.com", "wrongpass")).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));

        let (user, token) = svc.login(login_req("a@x.com", "longpass1")).await.unwrap();
        assert_eq!(svc.keys.verify(&token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn change_password_requires_both_fields() {
        let svc = service();
        let (user, _) = svc.register(register_req("a@x.com", "longpass1")).await.unwrap();
        let err = svc
            .change_password(
                user.id,
                ChangePasswordRequest {
                    old_password: Some("longpass1".into()),
                    new_password: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn forgot_password_requires_email() {
        let svc = service();
        let err = svc
            .forgot_password(ForgotPasswordRequest { email: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
