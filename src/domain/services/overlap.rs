use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::domain::models::booking::Booking;
use crate::domain::ports::BookingRepository;
use crate::error::AppError;

/// Half-open `[a_start, a_end)` against `[b_start, b_end)`. Touching ends do not overlap.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn validate_interval(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Result<(), AppError> {
    if check_in >= check_out {
        return Err(AppError::Validation("check_in must be before check_out".into()));
    }
    Ok(())
}

/// First non-cancelled booking in `existing` (other than `exclude_id`) that overlaps the interval.
pub fn find_conflict<'a>(
    existing: &'a [Booking],
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    exclude_id: Option<&str>,
) -> Option<&'a Booking> {
    existing
        .iter()
        .filter(|b| b.status.is_active())
        .filter(|b| exclude_id != Some(b.id.as_str()))
        .find(|b| intervals_overlap(check_in, check_out, b.check_in, b.check_out))
}

pub struct OverlapChecker {
    booking_repo: Arc<dyn BookingRepository>,
}

impl OverlapChecker {
    pub fn new(booking_repo: Arc<dyn BookingRepository>) -> Self {
        Self { booking_repo }
    }

    /// Returns the conflicting booking, if any. Callers must hold the property lock
    /// when the answer feeds a write.
    pub async fn has_overlap(
        &self,
        property_id: &str,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> Result<Option<Booking>, AppError> {
        validate_interval(check_in, check_out)?;
        let candidates = self.booking_repo.list_active_in_range(property_id, check_in, check_out).await?;
        Ok(find_conflict(&candidates, check_in, check_out, exclude_id).cloned())
    }
}
