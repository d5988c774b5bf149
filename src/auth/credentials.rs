use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::PublicUser,
        password::{check_policy, hash_new_password, verify_password},
        repo::UserStore,
        repo_types::{NewUser, ProfileChanges, ProfileUpdate, User},
    },
    error::{AppError, Result},
    state::AppState,
    workouts::WorkoutStore,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Treats absent and blank values alike.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn checked_email(raw: &str) -> Result<String> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        warn!("invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(email)
}

/// Owns user records and every path that touches a password hash.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
    workouts: Arc<dyn WorkoutStore>,
}

impl FromRef<AppState> for CredentialStore {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.workouts.clone())
    }
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>, workouts: Arc<dyn WorkoutStore>) -> Self {
        Self { users, workouts }
    }

    #[instrument(skip_all)]
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<PublicUser> {
        if name.trim().is_empty() || email.trim().is_empty() || raw_password.is_empty() {
            return Err(AppError::Validation("Please enter all fields".into()));
        }
        check_policy(raw_password)?;
        let email = checked_email(email)?;

        if self.users.find_by_email(&email).await?.is_some() {
            warn!("registration with an email already in use");
            return Err(AppError::Conflict("User already exists".into()));
        }

        let password_hash = hash_new_password(raw_password)?;
        let created = self
            .users
            .create(NewUser {
                name: name.trim().to_string(),
                email,
                password_hash,
            })
            .await?
            // lost a race with a concurrent registration
            .ok_or_else(|| AppError::Conflict("User already exists".into()))?;

        info!(user_id = %created.id, "user created");
        Ok(created.into())
    }

    /// Never fails: a mismatch or an unreadable stored hash is `false`.
    pub fn verify_password(&self, user: &User, raw_password: &str) -> bool {
        match verify_password(raw_password, &user.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, user_id = %user.id, "stored password hash unreadable");
                false
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<PublicUser>> {
        let users = self.users.list().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User> {
        self.users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    #[instrument(skip(self, name, email))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<PublicUser> {
        let name = non_empty(name).map(|n| n.trim().to_string());
        let email = non_empty(email).map(checked_email).transpose()?;
        if name.is_none() && email.is_none() {
            return Err(AppError::Validation(
                "Please enter at least one field".into(),
            ));
        }

        match self
            .users
            .update_profile(user_id, ProfileChanges { name, email })
            .await?
        {
            ProfileUpdate::Updated(user) => {
                info!(user_id = %user_id, "profile updated");
                Ok(user.into())
            }
            ProfileUpdate::Missing => Err(AppError::NotFound("User not found".into())),
            ProfileUpdate::EmailTaken => {
                warn!(user_id = %user_id, "email already in use by another account");
                Err(AppError::Conflict("Email already in use".into()))
            }
        }
    }

    #[instrument(skip(self, old_raw, new_raw))]
    pub async fn change_password(&self, user_id: Uuid, old_raw: &str, new_raw: &str) -> Result<()> {
        let user = self.find_by_id(user_id).await?;
        if !self.verify_password(&user, old_raw) {
            warn!(user_id = %user_id, "old password mismatch");
            return Err(AppError::Auth("Old password is incorrect".into()));
        }
        let password_hash = hash_new_password(new_raw)?;
        self.store_password_hash(user_id, &password_hash).await?;
        info!(user_id = %user_id, "password changed");
        Ok(())
    }

    /// Takes a hash produced by `hash_new_password`; shared by change and reset.
    pub(crate) async fn store_password_hash(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        if !self.users.set_password_hash(user_id, password_hash).await? {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    /// Deletes the user's workouts, then the user. If the workouts cannot be
    /// removed the user is kept so the request can be retried.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        self.find_by_id(user_id).await?;

        let removed = self
            .workouts
            .delete_all_for_user(user_id)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "workout cleanup failed; user kept");
                AppError::Internal(e)
            })?;

        if !self.users.delete(user_id).await? {
            return Err(AppError::NotFound("User not found".into()));
        }

        info!(user_id = %user_id, workouts = removed, "user deleted");
        Ok(())
    }
}
