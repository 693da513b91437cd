use std::env;

use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub push: PushConfig,
}

#[derive(Clone, Debug)]
pub struct PushConfig {
    pub public_key: String,
    pub private_key: String,
    pub subject: String,
}

impl PushConfig {
    pub fn from_env() -> Self {
        Self {
            public_key: env::var("VAPID_PUBLIC_KEY").unwrap_or_default(),
            private_key: env::var("VAPID_PRIVATE_KEY").unwrap_or_default(),
            subject: env::var("VAPID_SUBJECT")
                .unwrap_or_else(|_| "mailto:hello@vitalux.salon".to_string()),
        }
    }

    pub fn enabled(&self) -> bool {
        !(self.public_key.trim().is_empty() || self.private_key.trim().is_empty())
    }
}
