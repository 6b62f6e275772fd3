use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub mail_service_url: String,
    pub mail_service_token: String,
    pub worker_interval_secs: u64,
    pub reconcile_every_ticks: u32,
    pub log_dir: String,
    pub engine: EngineSettings,
}

/// Tunables handed to the booking, cleaning and email services.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub cleaning_offset: chrono::Duration,
    pub cleaning_collision_window: chrono::Duration,
    pub cleaning_cancel_window: chrono::Duration,
    pub email_batch_size: i64,
    pub email_max_retries: i32,
    pub email_retry_delay: chrono::Duration,
    pub email_claim_lease: chrono::Duration,
    pub mail_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cleaning_offset: chrono::Duration::hours(3),
            cleaning_collision_window: chrono::Duration::hours(2),
            cleaning_cancel_window: chrono::Duration::hours(24),
            email_batch_size: 50,
            email_max_retries: 3,
            email_retry_delay: chrono::Duration::hours(24),
            email_claim_lease: chrono::Duration::minutes(15),
            mail_timeout: Duration::from_secs(10),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| panic!("{} must be a number", key)),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = EngineSettings::default();
        let cleaning_offset = chrono::Duration::hours(env_or("CLEANING_OFFSET_HOURS", 3i64));

        let engine = EngineSettings {
            cleaning_offset,
            // Cancellation must still reach a task pushed far past checkout.
            cleaning_cancel_window: std::cmp::max(
                defaults.cleaning_cancel_window,
                cleaning_offset + defaults.cleaning_collision_window,
            ),
            email_batch_size: env_or("EMAIL_BATCH_SIZE", 50i64),
            email_max_retries: env_or("EMAIL_MAX_RETRIES", 3i32),
            email_retry_delay: chrono::Duration::hours(env_or("EMAIL_RETRY_DELAY_HOURS", 24i64)),
            email_claim_lease: chrono::Duration::minutes(env_or("EMAIL_CLAIM_LEASE_MINUTES", 15i64)),
            mail_timeout: Duration::from_secs(env_or("MAIL_TIMEOUT_SECS", 10u64)),
            ..defaults
        };

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env_or("PORT", 3000u16),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            worker_interval_secs: env_or("WORKER_INTERVAL_SECS", 60u64),
            reconcile_every_ticks: env_or("RECONCILE_EVERY_TICKS", 60u32),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()),
            engine,
        }
    }

    /// Storage backend picked from the URL scheme, for startup logs.
    pub fn backend_name(&self) -> &'static str {
        if self.database_url.starts_with("postgres://") || self.database_url.starts_with("postgresql://") { "postgres" } else { "sqlite" }
    }
}
