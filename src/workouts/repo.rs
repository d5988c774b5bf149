use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

/// The part of the workout catalog that account management depends on.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Removes every workout owned by `user_id`, returning how many went.
    async fn delete_all_for_user(&self, user_id: Uuid) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgWorkoutStore {
    db: PgPool,
}

impl PgWorkoutStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkoutStore for PgWorkoutStore {
    async fn delete_all_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM user_workouts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .with_context(|| format!("delete workouts of user {}", user_id))?;
        Ok(res.rows_affected())
    }
}

/// Counts of owned workouts per user.
#[derive(Default)]
pub struct HashMapWorkoutStore {
    owned: RwLock<HashMap<Uuid, u64>>,
    failing: bool,
}

impl HashMapWorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose deletions always fail.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn add(&self, user_id: Uuid, count: u64) {
        *self.owned.write().await.entry(user_id).or_default() += count;
    }

    pub async fn count_for(&self, user_id: Uuid) -> u64 {
        self.owned.read().await.get(&user_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl WorkoutStore for HashMapWorkoutStore {
    async fn delete_all_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        if self.failing {
            anyhow::bail!("workout store unavailable");
        }
        Ok(self.owned.write().await.remove(&user_id).unwrap_or(0))
    }
}
