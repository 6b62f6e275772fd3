use std::sync::Arc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, info, info_span, warn, Instrument};
use crate::config::EngineSettings;
use crate::domain::models::booking::BookingStatus;
use crate::domain::models::scheduled_email::{EmailStatus, ScheduledEmail};
use crate::domain::ports::{
    BookingRepository, Clock, MailTransport, PropertyRepository, ScheduledEmailRepository, SendOptions,
};
use crate::domain::services::email_renderer::EmailRenderer;
use crate::error::AppError;

/// Summary of one processor run, returned to the scheduler driver.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub processed: u32,
    pub sent: u32,
    pub retried: u32,
    pub failed: u32,
    pub skipped: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Retried,
    Failed,
    Skipped,
}

impl ProcessReport {
    fn record(&mut self, outcome: Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Sent => self.sent += 1,
            Outcome::Retried => self.retried += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Back to `pending` with the incremented counter.
    Retry { retry_count: i32 },
    /// Terminal `failed`.
    GiveUp { retry_count: i32 },
}

/// Linear backoff bounded by `max_retries`: with 3, the fourth failure is final.
pub fn failure_action(previous_retries: i32, max_retries: i32, permanent: bool) -> FailureAction {
    let retry_count = previous_retries + 1;
    if permanent || retry_count > max_retries {
        FailureAction::GiveUp { retry_count }
    } else {
        FailureAction::Retry { retry_count }
    }
}

/// Errors that will not improve with time.
fn is_permanent(err: &AppError) -> bool {
    matches!(err, AppError::NotFound(_) | AppError::Validation(_))
}

pub fn idempotency_key(email_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"scheduled-email:");
    hasher.update(email_id.as_bytes());
    hex::encode(hasher.finalize())
}

enum Delivery {
    Sent(String),
    BookingCancelled,
}

pub struct EmailProcessor {
    email_repo: Arc<dyn ScheduledEmailRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    property_repo: Arc<dyn PropertyRepository>,
    transport: Arc<dyn MailTransport>,
    renderer: Arc<EmailRenderer>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl EmailProcessor {
    pub fn new(
        email_repo: Arc<dyn ScheduledEmailRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        property_repo: Arc<dyn PropertyRepository>,
        transport: Arc<dyn MailTransport>,
        renderer: Arc<EmailRenderer>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self { email_repo, booking_repo, property_repo, transport, renderer, clock, settings }
    }

    /// Claims and dispatches one batch of due emails. One item's failure never aborts the batch.
    pub async fn process_pending_emails(&self) -> Result<ProcessReport, AppError> {
        let now = self.clock.now();

        let released = self.email_repo.release_stale_claims(now - self.settings.email_claim_lease).await?;
        if released > 0 {
            warn!(released, "Released stale email claims back to pending");
        }

        let mut batch = self.email_repo.claim_due(now, self.settings.email_batch_size).await?;
        batch.sort_by_key(|e| e.scheduled_for);

        let mut report = ProcessReport::default();
        for email in &batch {
            let span = info_span!(
                "scheduled_email",
                email_id = %email.id,
                email_type = %email.email_type,
                booking_id = %email.booking_id
            );
            let outcome = self.process_one(email).instrument(span).await;
            report.record(outcome);
        }

        if report.processed > 0 {
            info!(
                processed = report.processed,
                sent = report.sent,
                retried = report.retried,
                failed = report.failed,
                skipped = report.skipped,
                "Email batch processed"
            );
        }
        Ok(report)
    }

    /// Puts a permanently failed email back in the queue with a fresh retry budget.
    pub async fn retry_failed(&self, email_id: &str) -> Result<ScheduledEmail, AppError> {
        let email = self.email_repo.find_by_id(email_id).await?
            .ok_or(AppError::NotFound(format!("Scheduled email {} not found", email_id)))?;

        if email.status != EmailStatus::Failed {
            return Err(AppError::Validation(format!("Only failed emails can be retried (status is {})", email.status)));
        }

        let requeued = self.email_repo.requeue_failed(email_id, self.clock.now()).await?
            .ok_or(AppError::Validation("Email changed state while retrying".into()))?;
        info!(email_id = %email_id, "Failed email requeued by host");
        Ok(requeued)
    }

    async fn process_one(&self, email: &ScheduledEmail) -> Outcome {
        match self.deliver(email).await {
            Ok(Delivery::Sent(message_id)) => {
                if let Err(e) = self.email_repo.mark_sent(&email.id, self.clock.now(), &message_id).await {
                    // Delivered but not recorded; the lease will requeue it, accepting a duplicate.
                    error!("Failed to mark email as sent: {:?}", e);
                }
                info!(message_id = %message_id, "Email sent");
                Outcome::Sent
            }
            Ok(Delivery::BookingCancelled) => {
                if let Err(e) = self.email_repo.mark_cancelled(&email.id, "booking cancelled before dispatch").await {
                    error!("Failed to mark email as cancelled: {:?}", e);
                }
                info!("Booking cancelled, email skipped");
                Outcome::Skipped
            }
            Err(err) => self.record_failure(email, err).await,
        }
    }

    async fn deliver(&self, email: &ScheduledEmail) -> Result<Delivery, AppError> {
        let booking = self.booking_repo.find_by_id(&email.booking_id).await?
            .ok_or(AppError::NotFound(format!("Booking {} not found", email.booking_id)))?;

        if booking.status == BookingStatus::Cancelled {
            return Ok(Delivery::BookingCancelled);
        }

        let property = self.property_repo.find_by_id(&booking.property_id).await?
            .ok_or(AppError::NotFound(format!("Property {} not found", booking.property_id)))?;

        let rendered = self.renderer.render(email.email_type, &booking, &property)?;

        let timeout = self.settings.mail_timeout;
        let options = SendOptions { timeout, idempotency_key: Some(idempotency_key(&email.id)) };

        let send = self.transport.send(
            &email.recipient_email,
            &email.recipient_name,
            &rendered.subject,
            &rendered.html_body,
            Some(&rendered.text_body),
            &options,
        );

        match tokio::time::timeout(timeout, send).await {
            Ok(result) => Ok(Delivery::Sent(result?)),
            Err(_) => Err(AppError::TransientDispatch(format!("mail transport timed out after {:?}", timeout))),
        }
    }

    async fn record_failure(&self, email: &ScheduledEmail, err: AppError) -> Outcome {
        let message = err.to_string();
        let action = failure_action(email.retry_count, self.settings.email_max_retries, is_permanent(&err));

        let (outcome, result) = match action {
            FailureAction::Retry { retry_count } => {
                let next_attempt = self.clock.now() + self.settings.email_retry_delay;
                warn!(retry_count, next_attempt = %next_attempt, error = %message, "Email dispatch failed, will retry");
                (Outcome::Retried, self.email_repo.mark_retry(&email.id, retry_count, next_attempt, &message).await)
            }
            FailureAction::GiveUp { retry_count } => {
                error!(retry_count, error = %message, "Email dispatch failed permanently");
                (Outcome::Failed, self.email_repo.mark_failed(&email.id, retry_count, &message).await)
            }
        };

        if let Err(e) = result {
            error!("Failed to record email failure: {:?}", e);
        }
        outcome
    }
}
