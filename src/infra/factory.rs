use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::ports::{
    BookingEventHandler, BookingRepository, CleaningTaskRepository, Clock, MailTransport,
    PropertyRepository, ScheduledEmailRepository, SystemClock,
};
use crate::domain::services::{
    booking_service::BookingService, cleaning_service::CleaningTaskDeriver,
    email_processor::EmailProcessor, email_renderer::EmailRenderer,
    email_scheduler::EmailScheduler, property_locks::PropertyLocks,
};
use crate::infra::mail::http_mail_transport::HttpMailTransport;
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_cleaning_repo::PostgresCleaningRepo,
    postgres_property_repo::PostgresPropertyRepo, postgres_scheduled_email_repo::PostgresScheduledEmailRepo,
    sqlite_booking_repo::SqliteBookingRepo, sqlite_cleaning_repo::SqliteCleaningRepo,
    sqlite_property_repo::SqlitePropertyRepo, sqlite_scheduled_email_repo::SqliteScheduledEmailRepo,
};

/// Storage ports for one backend.
pub struct Repositories {
    pub property_repo: Arc<dyn PropertyRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub cleaning_repo: Arc<dyn CleaningTaskRepository>,
    pub email_repo: Arc<dyn ScheduledEmailRepository>,
}

impl Repositories {
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            property_repo: Arc::new(SqlitePropertyRepo::new(pool.clone())),
            booking_repo: Arc::new(SqliteBookingRepo::new(pool.clone())),
            cleaning_repo: Arc::new(SqliteCleaningRepo::new(pool.clone())),
            email_repo: Arc::new(SqliteScheduledEmailRepo::new(pool)),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            property_repo: Arc::new(PostgresPropertyRepo::new(pool.clone())),
            booking_repo: Arc::new(PostgresBookingRepo::new(pool.clone())),
            cleaning_repo: Arc::new(PostgresCleaningRepo::new(pool.clone())),
            email_repo: Arc::new(PostgresScheduledEmailRepo::new(pool)),
        }
    }
}

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;
    let mail_transport: Arc<dyn MailTransport> = Arc::new(HttpMailTransport::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));

    let repos = if config.backend_name() == "postgres" {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;
        Repositories::postgres(pool)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;
        Repositories::sqlite(pool)
    };

    assemble_state(config.clone(), repos, mail_transport, Arc::new(SystemClock))
}

/// Wires the engine services on top of the given ports.
pub fn assemble_state(
    config: Config,
    repos: Repositories,
    mail_transport: Arc<dyn MailTransport>,
    clock: Arc<dyn Clock>,
) -> AppState {
    let settings = config.engine.clone();
    let renderer = Arc::new(EmailRenderer::with_defaults().expect("Failed to load email templates"));

    let handlers: Vec<Arc<dyn BookingEventHandler>> = vec![
        Arc::new(CleaningTaskDeriver::new(repos.cleaning_repo.clone(), repos.property_repo.clone(), &settings)),
        Arc::new(EmailScheduler::new(repos.email_repo.clone(), clock.clone())),
    ];

    let booking_service = Arc::new(BookingService::new(
        repos.booking_repo.clone(),
        repos.property_repo.clone(),
        Arc::new(PropertyLocks::default()),
        handlers,
        clock.clone(),
    ));

    let email_processor = Arc::new(EmailProcessor::new(
        repos.email_repo.clone(),
        repos.booking_repo.clone(),
        repos.property_repo.clone(),
        mail_transport.clone(),
        renderer,
        clock.clone(),
        settings,
    ));

    AppState {
        config,
        property_repo: repos.property_repo,
        booking_repo: repos.booking_repo,
        cleaning_repo: repos.cleaning_repo,
        email_repo: repos.email_repo,
        mail_transport,
        booking_service,
        email_processor,
        clock,
    }
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
