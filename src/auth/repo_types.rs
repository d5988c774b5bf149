use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifetime of a password reset token, counted from `created_at`.
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Insert payload for a user; the hash is computed before it reaches a store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Outcome of a profile update at the storage layer.
#[derive(Debug)]
pub enum ProfileUpdate {
    Updated(User),
    Missing,
    /// The new email belongs to another account.
    EmailTaken,
}

/// Password reset token row. Only the SHA-256 of the raw token is kept.
#[derive(Debug, Clone, FromRow)]
pub struct ResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl ResetToken {
    pub fn new(user_id: Uuid, token_hash: String, created_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            created_at,
            expires_at: created_at + time::Duration::seconds(RESET_TOKEN_TTL_SECS),
        }
    }

    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}
