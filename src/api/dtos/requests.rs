use crate::domain::models::booking::{BookingPatch, BookingStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
pub struct CreateBookingRequest {
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

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Every field optional; an empty string clears optional text fields and
/// `"total_amount": null` clears the amount.
#[derive(Deserialize, Default)]
pub struct UpdateBookingRequest {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
    pub booking_platform: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub total_amount: Option<Option<f64>>,
    pub notes: Option<String>,
}

impl From<UpdateBookingRequest> for BookingPatch {
    fn from(req: UpdateBookingRequest) -> Self {
        BookingPatch {
            guest_name: req.guest_name,
            guest_email: req.guest_email,
            guest_phone: req.guest_phone,
            check_in: req.check_in,
            check_out: req.check_out,
            status: req.status,
            booking_platform: req.booking_platform,
            total_amount: req.total_amount,
            notes: req.notes,
        }
    }
}

#[derive(Deserialize)]
pub struct EmailStatusQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}
