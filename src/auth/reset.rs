use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::extract::FromRef;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        credentials::{non_empty, CredentialStore},
        password::hash_new_password,
        repo::ResetTokenStore,
        repo_types::ResetToken,
    },
    error::{AppError, Result},
    mail::{Mailer, PasswordResetEmail},
    state::AppState,
};

const RANDOM_BYTES: usize = 32;

/// Raw reset token: 32 random bytes in hex followed by the user id.
///
/// The user id suffix only ties the token to its owner by convention;
/// the random part is what makes it unguessable.
fn generate_raw_token(user_id: Uuid) -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{}{}", hex::encode(bytes), user_id)
}

/// Only this digest is ever persisted.
pub(crate) fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Issues, validates and consumes single-use password reset tokens.
#[derive(Clone)]
pub struct ResetTokens {
    credentials: CredentialStore,
    tokens: Arc<dyn ResetTokenStore>,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl FromRef<AppState> for ResetTokens {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            CredentialStore::from_ref(state),
            state.reset_tokens.clone(),
            state.mailer.clone(),
            state.config.frontend_url.clone(),
        )
    }
}

impl ResetTokens {
    pub fn new(
        credentials: CredentialStore,
        tokens: Arc<dyn ResetTokenStore>,
        mailer: Arc<dyn Mailer>,
        frontend_url: String,
    ) -> Self {
        Self {
            credentials,
            tokens,
            mailer,
            frontend_url,
        }
    }

    fn reset_link(&self, raw_token: &str) -> String {
        format!("{}/api/users/reset-password/{}", self.frontend_url, raw_token)
    }

    /// Replaces any earlier token of the user and mails the new one.
    ///
    /// The token row stays in place when delivery fails.
    #[instrument(skip_all)]
    pub async fn request_reset(&self, email: &str) -> Result<()> {
        let email = non_empty(Some(email))
            .ok_or_else(|| AppError::Validation("Email is required".into()))?;
        let user = self.credentials.find_by_email(email).await?;

        let now = OffsetDateTime::now_utc();
        match self.tokens.purge_expired(now).await {
            Ok(0) => {}
            Ok(n) => info!(purged = n, "expired reset tokens removed"),
            Err(e) => warn!(error = %e, "purging expired reset tokens failed"),
        }

        let raw_token = generate_raw_token(user.id);
        self.tokens
            .replace(ResetToken::new(user.id, hash_token(&raw_token), now))
            .await?;
        info!(user_id = %user.id, "reset token issued");

        let link = self.reset_link(&raw_token);
        let html = PasswordResetEmail {
            user_name: &user.name,
            reset_link: &link,
        }
        .render()
        .context("render password reset email")?;

        self.mailer
            .send(&user.email, PasswordResetEmail::SUBJECT, &html)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user.id, "reset email not sent");
                AppError::EmailDelivery(e)
            })?;

        info!(user_id = %user.id, "reset email sent");
        Ok(())
    }

    /// Sets a new password for the owner of a live token.
    ///
    /// The token is claimed and removed in one store operation before the
    /// password is written, so concurrent calls with the same token see at
    /// most one success. Unknown and expired tokens are reported identically.
    #[instrument(skip_all)]
    pub async fn consume_reset(&self, raw_token: &str, new_raw_password: &str) -> Result<()> {
        if non_empty(Some(raw_token)).is_none() {
            return Err(AppError::Validation("Token is required".into()));
        }
        if non_empty(Some(new_raw_password)).is_none() {
            return Err(AppError::Validation("Password is required".into()));
        }
        // a password the policy rejects must not spend the token
        let password_hash = hash_new_password(new_raw_password)?;

        let token = self
            .tokens
            .take_live_by_hash(&hash_token(raw_token), OffsetDateTime::now_utc())
            .await?
            .ok_or_else(|| {
                warn!("unknown or expired reset token");
                AppError::NotFound("Token not found".into())
            })?;

        self.credentials
            .store_password_hash(token.user_id, &password_hash)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    user_id = %token.user_id,
                    "reset token spent but password not stored"
                );
                e
            })?;

        info!(user_id = %token.user_id, "password reset");
        Ok(())
    }
}
