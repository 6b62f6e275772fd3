use rental_backend::{
    api::router::create_router,
    config::{Config, EngineSettings},
    domain::models::booking::{Booking, NewBookingParams},
    domain::models::property::Property,
    domain::ports::{Clock, MailTransport, SendOptions},
    error::AppError,
    infra::factory::{assemble_state, Repositories},
    state::AppState,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, header},
    Router,
};
use std::str::FromStr;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tower::ServiceExt;
use serde_json::Value;

/// Clock pinned to a settable instant.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

#[allow(dead_code)]
impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipient: String,
    pub recipient_name: String,
    pub subject: String,
    pub html_body: String,
    pub idempotency_key: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum MailBehavior {
    Fail,
    Hang,
}

/// Records every send. Scripted behaviors are consumed first, then `default` applies.
pub struct MockMailTransport {
    pub sent: Mutex<Vec<SentMail>>,
    script: Mutex<VecDeque<MailBehavior>>,
    default: Mutex<Option<MailBehavior>>,
}

#[allow(dead_code)]
impl MockMailTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            default: Mutex::new(None),
        }
    }

    pub fn push(&self, behavior: MailBehavior) {
        self.script.lock().unwrap().push_back(behavior);
    }

    pub fn always(&self, behavior: Option<MailBehavior>) {
        *self.default.lock().unwrap() = behavior;
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn send(
        &self,
        recipient: &str,
        recipient_name: &str,
        subject: &str,
        html_body: &str,
        _text_body: Option<&str>,
        options: &SendOptions,
    ) -> Result<String, AppError> {
        let behavior = self.script.lock().unwrap().pop_front().or(*self.default.lock().unwrap());
        match behavior {
            Some(MailBehavior::Fail) => Err(AppError::TransientDispatch("relay returned 503".into())),
            Some(MailBehavior::Hang) => {
                tokio::time::sleep(StdDuration::from_secs(3600)).await;
                Err(AppError::TransientDispatch("unreachable".into()))
            }
            None => {
                self.sent.lock().unwrap().push(SentMail {
                    recipient: recipient.to_string(),
                    recipient_name: recipient_name.to_string(),
                    subject: subject.to_string(),
                    html_body: html_body.to_string(),
                    idempotency_key: options.idempotency_key.clone(),
                });
                Ok(format!("msg-{}", Uuid::new_v4()))
            }
        }
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub clock: Arc<TestClock>,
    pub mail: Arc<MockMailTransport>,
}

/// Reference "now" for tests: 2030-05-01 00:00 UTC, well before the stays used in tests.
#[allow(dead_code)]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn june(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, day, hour, 0, 0).unwrap()
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let mut settings = EngineSettings::default();
        settings.mail_timeout = StdDuration::from_millis(200);
        Self::with_settings(settings).await
    }

    pub async fn with_settings(settings: EngineSettings) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(StdDuration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            worker_interval_secs: 60,
            reconcile_every_ticks: 60,
            log_dir: "./logs".to_string(),
            engine: settings,
        };

        let clock = Arc::new(TestClock::at(test_now()));
        let mail = Arc::new(MockMailTransport::new());

        let state = Arc::new(assemble_state(
            config,
            Repositories::sqlite(pool.clone()),
            mail.clone(),
            clock.clone(),
        ));
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            clock,
            mail,
        }
    }

    pub async fn seed_property(&self, name: &str) -> Property {
        let mut property = Property::new(name.to_string(), "Europe/Lisbon".to_string());
        property.address = Some("Rua das Flores 12, Lisboa".into());
        property.check_in_instructions = Some("Key box code 4711".into());
        property.default_cleaning_cost = Some(45.0);
        property.review_url = Some("https://reviews.example.com/stay".into());
        self.state.property_repo.create(&property).await.unwrap()
    }

    pub async fn book(&self, property_id: &str, guest: &str, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Result<Booking, AppError> {
        self.state.booking_service.create(booking_params(property_id, guest, check_in, check_out)).await
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (axum::http::StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }
}

#[allow(dead_code)]
pub fn booking_params(property_id: &str, guest: &str, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> NewBookingParams {
    NewBookingParams {
        property_id: property_id.to_string(),
        guest_name: guest.to_string(),
        guest_email: Some(format!("{}@example.com", guest.to_lowercase())),
        guest_phone: None,
        check_in,
        check_out,
        status: None,
        booking_platform: Some("airbnb".into()),
        total_amount: Some(480.0),
        notes: None,
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
