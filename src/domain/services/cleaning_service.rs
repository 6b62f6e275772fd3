use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use crate::config::EngineSettings;
use crate::domain::models::booking::Booking;
use crate::domain::models::cleaning::CleaningTask;
use crate::domain::models::events::BookingEvent;
use crate::domain::ports::{BookingEventHandler, CleaningTaskRepository, PropertyRepository};
use crate::error::AppError;

/// Keeps one cleaning task per checkout in step with the booking lifecycle.
pub struct CleaningTaskDeriver {
    cleaning_repo: Arc<dyn CleaningTaskRepository>,
    property_repo: Arc<dyn PropertyRepository>,
    offset: Duration,
    collision_window: Duration,
    cancel_window: Duration,
}

impl CleaningTaskDeriver {
    pub fn new(
        cleaning_repo: Arc<dyn CleaningTaskRepository>,
        property_repo: Arc<dyn PropertyRepository>,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            cleaning_repo,
            property_repo,
            offset: settings.cleaning_offset,
            collision_window: settings.cleaning_collision_window,
            cancel_window: settings.cleaning_cancel_window,
        }
    }

    pub fn cleaning_time(&self, check_out: DateTime<Utc>) -> DateTime<Utc> {
        check_out + self.offset
    }

    /// Creates the cleaning task for the booking's checkout unless one already sits in the
    /// collision window. Returns the created task.
    pub async fn derive(&self, booking: &Booking) -> Result<Option<CleaningTask>, AppError> {
        let at = self.cleaning_time(booking.check_out);
        let existing = self.cleaning_repo
            .find_active_in_window(&booking.property_id, at - self.collision_window, at + self.collision_window)
            .await?;

        if let Some(task) = existing.first() {
            debug!(booking_id = %booking.id, cleaning_id = %task.id, "Cleaning already scheduled for this checkout");
            return Ok(None);
        }

        let cost = self.property_repo.find_by_id(&booking.property_id).await?
            .and_then(|p| p.default_cleaning_cost);

        let task = CleaningTask::new(
            booking.property_id.clone(),
            Some(booking.id.clone()),
            at,
            cost,
            Some(format!("Checkout cleaning for booking {} ({})", booking.id, booking.guest_name)),
        );
        let created = self.cleaning_repo.create(&task).await?;
        info!(booking_id = %booking.id, cleaning_id = %created.id, cleaning_date = %created.cleaning_date, "Cleaning task scheduled");
        Ok(Some(created))
    }

    /// Cancels the still-scheduled task(s) following the booking's checkout.
    pub async fn cancel_for_checkout(&self, booking: &Booking, reason: &str) -> Result<u64, AppError> {
        let note = format!("Cancelled: booking {} {}", booking.id, reason);
        let cancelled = self.cleaning_repo
            .cancel_scheduled_in_window(
                &booking.property_id,
                &booking.id,
                booking.check_out,
                booking.check_out + self.cancel_window,
                &note,
            )
            .await?;
        if cancelled > 0 {
            info!(booking_id = %booking.id, cancelled, "Cleaning task(s) cancelled");
        }
        Ok(cancelled)
    }
}

#[async_trait]
impl BookingEventHandler for CleaningTaskDeriver {
    fn name(&self) -> &'static str {
        "cleaning_task_deriver"
    }

    async fn handle(&self, event: &BookingEvent) -> Result<(), AppError> {
        match event {
            BookingEvent::Confirmed(booking) => {
                self.derive(booking).await?;
            }
            BookingEvent::DatesChanged { previous, current } => {
                if previous.check_out != current.check_out {
                    self.cancel_for_checkout(previous, "was rescheduled").await?;
                    self.derive(current).await?;
                }
            }
            BookingEvent::ContactChanged(_) => {}
            BookingEvent::Cancelled(booking) => {
                self.cancel_for_checkout(booking, "was cancelled").await?;
            }
            BookingEvent::Withdrawn(booking) => {
                self.cancel_for_checkout(booking, "returned to pending").await?;
            }
            BookingEvent::Deleted(booking) => {
                self.cancel_for_checkout(booking, "was deleted").await?;
            }
        }
        Ok(())
    }
}
