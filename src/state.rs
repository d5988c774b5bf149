use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::memory::{HashMapResetTokenStore, HashMapUserStore};
use crate::auth::repo::{PgResetTokenStore, PgUserStore, ResetTokenStore, UserStore};
use crate::config::AppConfig;
use crate::mail::{MailgunMailer, Mailer, Outbox};
use crate::workouts::{HashMapWorkoutStore, PgWorkoutStore, WorkoutStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub reset_tokens: Arc<dyn ResetTokenStore>,
    pub workouts: Arc<dyn WorkoutStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn init(config: AppConfig, db: PgPool) -> Self {
        let mailer = match &config.mail {
            Some(mail) => {
                Arc::new(MailgunMailer::new(mail, reqwest::Client::new())) as Arc<dyn Mailer>
            }
            None => {
                tracing::warn!("MAILGUN_API_KEY not set; reset emails stay in the local outbox");
                Arc::new(Outbox::new()) as Arc<dyn Mailer>
            }
        };

        Self {
            config: Arc::new(config),
            users: Arc::new(PgUserStore::new(db.clone())),
            reset_tokens: Arc::new(PgResetTokenStore::new(db.clone())),
            workouts: Arc::new(PgWorkoutStore::new(db)),
            mailer,
        }
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        reset_tokens: Arc<dyn ResetTokenStore>,
        workouts: Arc<dyn WorkoutStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            users,
            reset_tokens,
            workouts,
            mailer,
        }
    }

    /// In-memory state with test configuration.
    pub fn fake() -> Self {
        Self::fake_with(Arc::new(Outbox::new()))
    }

    pub fn fake_with(mailer: Arc<dyn Mailer>) -> Self {
        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(HashMapUserStore::new()),
            Arc::new(HashMapResetTokenStore::new()),
            Arc::new(HashMapWorkoutStore::new()),
            mailer,
        )
    }
}
