use crate::domain::models::{
    booking::Booking, cleaning::CleaningTask, events::BookingEvent, property::Property,
    scheduled_email::{EmailStatus, EmailType, ScheduledEmail},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn create(&self, property: &Property) -> Result<Property, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Property>, AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn list_by_property(&self, property_id: &str) -> Result<Vec<Booking>, AppError>;
    /// Non-cancelled bookings of the property whose `[check_in, check_out)` intersects `[start, end)`.
    async fn list_active_in_range(&self, property_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    async fn list_confirmed_ending_after(&self, after: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    async fn update(&self, booking: &Booking) -> Result<Booking, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait CleaningTaskRepository: Send + Sync {
    async fn create(&self, task: &CleaningTask) -> Result<CleaningTask, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<CleaningTask>, AppError>;
    async fn list_by_property(&self, property_id: &str) -> Result<Vec<CleaningTask>, AppError>;
    /// Non-cancelled tasks of the property with `from <= cleaning_date <= to`.
    async fn find_active_in_window(&self, property_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<CleaningTask>, AppError>;
    /// Moves `scheduled` tasks in the window that belong to `booking_id` (or to no booking) to
    /// `cancelled`, appending `note`. Returns the number touched.
    async fn cancel_scheduled_in_window(&self, property_id: &str, booking_id: &str, from: DateTime<Utc>, to: DateTime<Utc>, note: &str) -> Result<u64, AppError>;
}

#[async_trait]
pub trait ScheduledEmailRepository: Send + Sync {
    async fn create(&self, email: &ScheduledEmail) -> Result<ScheduledEmail, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<ScheduledEmail>, AppError>;
    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<ScheduledEmail>, AppError>;
    async fn list_by_status(&self, status: EmailStatus, limit: i64) -> Result<Vec<ScheduledEmail>, AppError>;
    /// The non-cancelled record for the pair, if any.
    async fn find_active(&self, booking_id: &str, email_type: EmailType) -> Result<Option<ScheduledEmail>, AppError>;
    /// Cancels pending records for the same booking and type and inserts `email`, in one transaction.
    /// Returns `None` without inserting when an in-flight or terminal record already holds the pair.
    async fn replace_pending(&self, email: &ScheduledEmail) -> Result<Option<ScheduledEmail>, AppError>;
    async fn cancel_pending(&self, booking_id: &str, email_type: Option<EmailType>) -> Result<u64, AppError>;
    /// Atomically moves due `pending` records to `processing` and returns them.
    async fn claim_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ScheduledEmail>, AppError>;
    async fn release_stale_claims(&self, claimed_before: DateTime<Utc>) -> Result<u64, AppError>;
    async fn mark_sent(&self, id: &str, sent_at: DateTime<Utc>, message_id: &str) -> Result<bool, AppError>;
    async fn mark_retry(&self, id: &str, retry_count: i32, next_attempt: DateTime<Utc>, error_message: &str) -> Result<bool, AppError>;
    async fn mark_failed(&self, id: &str, retry_count: i32, error_message: &str) -> Result<bool, AppError>;
    async fn mark_cancelled(&self, id: &str, reason: &str) -> Result<bool, AppError>;
    /// Moves a `failed` record back to `pending` with a fresh retry budget.
    async fn requeue_failed(&self, id: &str, scheduled_for: DateTime<Utc>) -> Result<Option<ScheduledEmail>, AppError>;
}

/// Per-send options supplied by the caller.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub timeout: Duration,
    pub idempotency_key: Option<String>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Delivers one message and returns the provider's message id.
    async fn send(
        &self,
        recipient: &str,
        recipient_name: &str,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
        options: &SendOptions,
    ) -> Result<String, AppError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reacts to booking lifecycle events. Implementations must be idempotent.
#[async_trait]
pub trait BookingEventHandler: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle(&self, event: &BookingEvent) -> Result<(), AppError>;
}
