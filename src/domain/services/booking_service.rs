use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use crate::domain::models::booking::{Booking, BookingPatch, BookingStatus, NewBookingParams};
use crate::domain::models::events::BookingEvent;
use crate::domain::ports::{BookingEventHandler, BookingRepository, Clock, PropertyRepository};
use crate::domain::services::overlap::{validate_interval, OverlapChecker};
use crate::domain::services::property_locks::PropertyLocks;
use crate::error::AppError;

/// Owns the booking lifecycle. Every mutation runs under the property lock:
/// overlap check, write and derived-record handlers happen as one unit per property.
pub struct BookingService {
    booking_repo: Arc<dyn BookingRepository>,
    property_repo: Arc<dyn PropertyRepository>,
    overlap: OverlapChecker,
    locks: Arc<PropertyLocks>,
    handlers: Vec<Arc<dyn BookingEventHandler>>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        property_repo: Arc<dyn PropertyRepository>,
        locks: Arc<PropertyLocks>,
        handlers: Vec<Arc<dyn BookingEventHandler>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            overlap: OverlapChecker::new(booking_repo.clone()),
            booking_repo,
            property_repo,
            locks,
            handlers,
            clock,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Booking, AppError> {
        self.booking_repo.find_by_id(id).await?
            .ok_or(AppError::NotFound(format!("Booking {} not found", id)))
    }

    pub async fn list_by_property(&self, property_id: &str) -> Result<Vec<Booking>, AppError> {
        self.booking_repo.list_by_property(property_id).await
    }

    pub async fn create(&self, params: NewBookingParams) -> Result<Booking, AppError> {
        if params.guest_name.trim().is_empty() {
            return Err(AppError::Validation("guest_name must not be empty".into()));
        }
        validate_interval(params.check_in, params.check_out)?;

        self.property_repo.find_by_id(&params.property_id).await?
            .ok_or(AppError::NotFound(format!("Property {} not found", params.property_id)))?;

        let _guard = self.locks.acquire(&params.property_id).await;

        let mut booking = Booking::new(params);
        let now = self.clock.now();
        booking.created_at = now;
        booking.updated_at = now;

        if booking.status.is_active()
            && let Some(conflict) = self.overlap
                .has_overlap(&booking.property_id, booking.check_in, booking.check_out, None)
                .await?
        {
            warn!(
                property_id = %booking.property_id,
                conflicting_booking = %conflict.id,
                "Booking rejected: dates overlap existing reservation"
            );
            return Err(AppError::conflict_with(&conflict.guest_name, &conflict.id));
        }

        let created = self.booking_repo.create(&booking).await?;
        info!(booking_id = %created.id, property_id = %created.property_id, status = %created.status, "Booking created");

        if created.status == BookingStatus::Confirmed {
            self.emit(BookingEvent::Confirmed(created.clone())).await;
        }
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: BookingPatch) -> Result<Booking, AppError> {
        let property_id = self.get(id).await?.property_id;
        let _guard = self.locks.acquire(&property_id).await;

        // Re-read under the lock; a concurrent writer may have changed the record.
        let previous = self.get(id).await?;
        let mut next = previous.clone();
        apply_patch(&mut next, &patch);

        if next.guest_name.trim().is_empty() {
            return Err(AppError::Validation("guest_name must not be empty".into()));
        }
        validate_interval(next.check_in, next.check_out)?;

        let reactivated = !previous.status.is_active() && next.status.is_active();
        if next.status.is_active()
            && (patch.touches_dates() || reactivated)
            && let Some(conflict) = self.overlap
                .has_overlap(&next.property_id, next.check_in, next.check_out, Some(&next.id))
                .await?
        {
            warn!(
                booking_id = %next.id,
                conflicting_booking = %conflict.id,
                "Booking update rejected: dates overlap existing reservation"
            );
            return Err(AppError::conflict_with(&conflict.guest_name, &conflict.id));
        }

        next.updated_at = self.clock.now();
        let updated = self.booking_repo.update(&next).await?;
        info!(booking_id = %updated.id, status = %updated.status, "Booking updated");

        for event in lifecycle_events(&previous, &updated) {
            self.emit(event).await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let property_id = self.get(id).await?.property_id;
        let _guard = self.locks.acquire(&property_id).await;

        let existing = self.get(id).await?;
        self.booking_repo.delete(id).await?;
        info!(booking_id = %id, property_id = %existing.property_id, "Booking deleted");

        self.emit(BookingEvent::Deleted(existing)).await;
        Ok(())
    }

    /// Re-emits `Confirmed` for live confirmed bookings so handlers can repair missing
    /// cleaning tasks and emails. Returns how many bookings were replayed.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let bookings = self.booking_repo.list_confirmed_ending_after(now).await?;
        let mut replayed = 0;

        for candidate in bookings {
            let _guard = self.locks.acquire(&candidate.property_id).await;
            let Some(current) = self.booking_repo.find_by_id(&candidate.id).await? else { continue };
            if current.status != BookingStatus::Confirmed {
                continue;
            }
            self.emit(BookingEvent::Confirmed(current)).await;
            replayed += 1;
        }

        info!(replayed, "Reconciliation sweep finished");
        Ok(replayed)
    }

    /// Runs every handler. A failing handler is recorded and never undoes the booking write.
    async fn emit(&self, event: BookingEvent) -> usize {
        let mut failures = 0;
        for handler in &self.handlers {
            if let Err(e) = handler.handle(&event).await {
                failures += 1;
                let derived = AppError::DerivedState(format!("{} on {}: {}", handler.name(), event.kind(), e));
                error!(
                    booking_id = %event.booking().id,
                    event = event.kind(),
                    handler = handler.name(),
                    error = %derived,
                    "Derived state update failed"
                );
            }
        }
        failures
    }
}

fn apply_patch(booking: &mut Booking, patch: &BookingPatch) {
    if let Some(name) = &patch.guest_name { booking.guest_name = name.clone(); }
    if let Some(email) = &patch.guest_email {
        booking.guest_email = if email.trim().is_empty() { None } else { Some(email.clone()) };
    }
    if let Some(phone) = &patch.guest_phone {
        booking.guest_phone = if phone.trim().is_empty() { None } else { Some(phone.clone()) };
    }
    if let Some(check_in) = patch.check_in { booking.check_in = check_in; }
    if let Some(check_out) = patch.check_out { booking.check_out = check_out; }
    if let Some(status) = patch.status { booking.status = status; }
    if let Some(platform) = &patch.booking_platform { booking.booking_platform = platform.clone(); }
    if let Some(amount) = patch.total_amount { booking.total_amount = amount; }
    if let Some(notes) = &patch.notes {
        booking.notes = if notes.is_empty() { None } else { Some(notes.clone()) };
    }
}

/// Events implied by a committed transition from `previous` to `current`.
pub fn lifecycle_events(previous: &Booking, current: &Booking) -> Vec<BookingEvent> {
    let dates_changed = previous.check_in != current.check_in || previous.check_out != current.check_out;
    let contact_changed = previous.guest_name != current.guest_name
        || previous.contact_email() != current.contact_email();

    if current.status == BookingStatus::Cancelled && previous.status != BookingStatus::Cancelled {
        let mut cancelled = previous.clone();
        cancelled.status = BookingStatus::Cancelled;
        return vec![BookingEvent::Cancelled(cancelled)];
    }

    if previous.status.owns_derived_records() && !current.status.owns_derived_records() {
        let mut withdrawn = previous.clone();
        withdrawn.status = current.status;
        return vec![BookingEvent::Withdrawn(withdrawn)];
    }

    if previous.status.owns_derived_records() && current.status.owns_derived_records() {
        if dates_changed {
            return vec![BookingEvent::DatesChanged { previous: previous.clone(), current: current.clone() }];
        }
        if contact_changed {
            return vec![BookingEvent::ContactChanged(current.clone())];
        }
    }

    if current.status == BookingStatus::Confirmed && previous.status != BookingStatus::Confirmed {
        return vec![BookingEvent::Confirmed(current.clone())];
    }

    Vec::new()
}
