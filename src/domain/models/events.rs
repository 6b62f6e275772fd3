use super::booking::Booking;

/// Lifecycle events emitted by the booking service after a committed write.
#[derive(Debug, Clone)]
pub enum BookingEvent {
    Confirmed(Booking),
    /// Dates moved on a booking that already owns a cleaning task and guest emails.
    DatesChanged { previous: Booking, current: Booking },
    /// Guest name or address changed while the dates stayed put.
    ContactChanged(Booking),
    /// Carries the booking with the dates it had before the cancelling write.
    Cancelled(Booking),
    /// Left the statuses that own derived records without being cancelled (back to `pending`).
    /// Carries the previous dates so the old checkout's task can be found.
    Withdrawn(Booking),
    Deleted(Booking),
}

impl BookingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BookingEvent::Confirmed(_) => "booking_confirmed",
            BookingEvent::DatesChanged { .. } => "booking_dates_changed",
            BookingEvent::ContactChanged(_) => "booking_contact_changed",
            BookingEvent::Cancelled(_) => "booking_cancelled",
            BookingEvent::Withdrawn(_) => "booking_withdrawn",
            BookingEvent::Deleted(_) => "booking_deleted",
        }
    }

    pub fn booking(&self) -> &Booking {
        match self {
            BookingEvent::Confirmed(b)
            | BookingEvent::ContactChanged(b)
            | BookingEvent::Cancelled(b)
            | BookingEvent::Withdrawn(b)
            | BookingEvent::Deleted(b) => b,
            BookingEvent::DatesChanged { current, .. } => current,
        }
    }
}
