use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;
use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses that occupy the calendar and take part in overlap checks.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    /// Statuses under which the booking owns a cleaning task and guest emails.
    pub fn owns_derived_records(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::CheckedIn | BookingStatus::CheckedOut)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "checked_in" => Ok(BookingStatus::CheckedIn),
            "checked_out" => Ok(BookingStatus::CheckedOut),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(UnknownVariant { kind: "booking status", value }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Booking {
    pub id: String,
    pub property_id: String,
    pub guest_name: String,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub booking_platform: String,
    pub total_amount: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewBookingParams {
    pub property_id: String,
    pub guest_name: String,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub status: Option<BookingStatus>,
    pub booking_platform: Option<String>,
    pub total_amount: Option<f64>,
    pub notes: Option<String>,
}

impl Booking {
    pub fn new(params: NewBookingParams) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            property_id: params.property_id,
            guest_name: params.guest_name,
            guest_email: params.guest_email.filter(|e| !e.trim().is_empty()),
            guest_phone: params.guest_phone.filter(|p| !p.trim().is_empty()),
            check_in: params.check_in,
            check_out: params.check_out,
            status: params.status.unwrap_or(BookingStatus::Confirmed),
            booking_platform: params.booking_platform.unwrap_or_else(|| "manual".to_string()),
            total_amount: params.total_amount,
            notes: params.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recipient address for guest emails, if the booking has a usable one.
    pub fn contact_email(&self) -> Option<&str> {
        self.guest_email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Partial update of a booking. For optional text fields an empty string clears the value;
/// `total_amount: Some(None)` clears the amount.
#[derive(Debug, Default, Clone)]
pub struct BookingPatch {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
    pub booking_platform: Option<String>,
    pub total_amount: Option<Option<f64>>,
    pub notes: Option<String>,
}

impl BookingPatch {
    pub fn touches_dates(&self) -> bool {
        self.check_in.is_some() || self.check_out.is_some()
    }
}
