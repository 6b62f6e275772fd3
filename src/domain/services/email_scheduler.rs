use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};
use crate::domain::models::booking::Booking;
use crate::domain::models::events::BookingEvent;
use crate::domain::models::scheduled_email::{EmailStatus, EmailType, ScheduledEmail};
use crate::domain::ports::{BookingEventHandler, Clock, ScheduledEmailRepository};
use crate::error::AppError;

pub fn fire_time(email_type: EmailType, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> DateTime<Utc> {
    match email_type {
        EmailType::CheckInInstructions => check_in - Duration::days(2),
        EmailType::CheckoutReminder => check_out - Duration::days(1),
        EmailType::ThankYouReview => check_out + Duration::days(2),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailPlan {
    pub email_type: EmailType,
    pub fire_at: DateTime<Utc>,
    /// False when the fire time has already passed; such candidates are dropped.
    pub schedulable: bool,
}

/// Fire times for every guest email of a stay. The review request is always kept.
pub fn plan_emails(check_in: DateTime<Utc>, check_out: DateTime<Utc>, now: DateTime<Utc>) -> Vec<EmailPlan> {
    EmailType::ALL
        .iter()
        .map(|&email_type| {
            let fire_at = fire_time(email_type, check_in, check_out);
            let schedulable = match email_type {
                EmailType::ThankYouReview => true,
                EmailType::CheckInInstructions | EmailType::CheckoutReminder => fire_at > now,
            };
            EmailPlan { email_type, fire_at, schedulable }
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleOutcome {
    pub created: u32,
    pub kept: u32,
    pub dropped: u32,
}

pub struct EmailScheduler {
    email_repo: Arc<dyn ScheduledEmailRepository>,
    clock: Arc<dyn Clock>,
}

impl EmailScheduler {
    pub fn new(email_repo: Arc<dyn ScheduledEmailRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { email_repo, clock }
    }

    /// Brings the booking's pending guest emails in line with its current dates and contact.
    pub async fn schedule_for_booking(&self, booking: &Booking) -> Result<ScheduleOutcome, AppError> {
        let mut outcome = ScheduleOutcome::default();
        let Some(recipient) = booking.contact_email() else {
            // Nobody to write to: anything still queued targets an address the booking no longer has.
            let cancelled = self.email_repo.cancel_pending(&booking.id, None).await?;
            debug!(booking_id = %booking.id, cancelled, "No guest email on booking, pending emails cancelled");
            outcome.dropped = cancelled as u32;
            return Ok(outcome);
        };

        let now = self.clock.now();
        for plan in plan_emails(booking.check_in, booking.check_out, now) {
            let existing = self.email_repo.find_active(&booking.id, plan.email_type).await?;

            if let Some(current) = &existing {
                // In-flight or terminal records are history; never stack a second one next to them.
                if current.status != EmailStatus::Pending {
                    outcome.kept += 1;
                    continue;
                }
                if current.scheduled_for == plan.fire_at
                    && current.recipient_email == recipient
                    && current.recipient_name == booking.guest_name
                {
                    outcome.kept += 1;
                    continue;
                }
            }

            if !plan.schedulable {
                if existing.is_some() {
                    self.email_repo.cancel_pending(&booking.id, Some(plan.email_type)).await?;
                }
                outcome.dropped += 1;
                continue;
            }

            let email = ScheduledEmail::new(
                booking.id.clone(),
                plan.email_type,
                recipient.to_string(),
                booking.guest_name.clone(),
                plan.fire_at,
            );
            match self.email_repo.replace_pending(&email).await? {
                Some(_) => outcome.created += 1,
                None => outcome.kept += 1,
            }
        }

        info!(
            booking_id = %booking.id,
            created = outcome.created,
            kept = outcome.kept,
            dropped = outcome.dropped,
            "Guest emails scheduled"
        );
        Ok(outcome)
    }

    pub async fn cancel_for_booking(&self, booking_id: &str) -> Result<u64, AppError> {
        let cancelled = self.email_repo.cancel_pending(booking_id, None).await?;
        if cancelled > 0 {
            info!(booking_id = %booking_id, cancelled, "Pending guest emails cancelled");
        }
        Ok(cancelled)
    }
}

#[async_trait]
impl BookingEventHandler for EmailScheduler {
    fn name(&self) -> &'static str {
        "email_scheduler"
    }

    async fn handle(&self, event: &BookingEvent) -> Result<(), AppError> {
        match event {
            BookingEvent::Confirmed(booking)
            | BookingEvent::DatesChanged { current: booking, .. }
            | BookingEvent::ContactChanged(booking) => {
                self.schedule_for_booking(booking).await?;
            }
            BookingEvent::Cancelled(booking) | BookingEvent::Withdrawn(booking) | BookingEvent::Deleted(booking) => {
                self.cancel_for_booking(&booking.id).await?;
            }
        }
        Ok(())
    }
}
