use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    repo::{ResetTokenStore, UserStore},
    repo_types::{NewUser, ProfileChanges, ProfileUpdate, ResetToken, User},
};

#[derive(Default)]
pub struct HashMapUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl HashMapUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for HashMapUserStore {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> anyhow::Result<ProfileUpdate> {
        let mut users = self.users.write().await;
        if let Some(email) = &changes.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Ok(ProfileUpdate::EmailTaken);
            }
        }
        let Some(current) = users.get(&id) else {
            return Ok(ProfileUpdate::Missing);
        };
        let updated = User {
            name: changes.name.unwrap_or_else(|| current.name.clone()),
            email: changes.email.unwrap_or_else(|| current.email.clone()),
            updated_at: OffsetDateTime::now_utc(),
            ..current.clone()
        };
        users.insert(id, updated.clone());
        Ok(ProfileUpdate::Updated(updated))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        let Some(current) = users.get(&id) else {
            return Ok(false);
        };
        let updated = User {
            password_hash: password_hash.to_string(),
            updated_at: OffsetDateTime::now_utc(),
            ..current.clone()
        };
        users.insert(id, updated);
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

/// Keyed by user id, which keeps at most one token per user.
#[derive(Default)]
pub struct HashMapResetTokenStore {
    tokens: RwLock<HashMap<Uuid, ResetToken>>,
}

impl HashMapResetTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    #[cfg(test)]
    pub async fn token_for_user(&self, user_id: Uuid) -> Option<ResetToken> {
        self.tokens.read().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl ResetTokenStore for HashMapResetTokenStore {
    async fn replace(&self, token: ResetToken) -> anyhow::Result<()> {
        self.tokens.write().await.insert(token.user_id, token);
        Ok(())
    }

    async fn take_live_by_hash(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<ResetToken>> {
        let mut tokens = self.tokens.write().await;
        let owner = tokens
            .values()
            .find(|t| t.token_hash == token_hash && t.is_live(now))
            .map(|t| t.user_id);
        Ok(owner.and_then(|user_id| tokens.remove(&user_id)))
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.is_live(now));
        Ok((before - tokens.len()) as u64)
    }
}
