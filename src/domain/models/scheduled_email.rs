use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;
use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailType {
    CheckInInstructions,
    CheckoutReminder,
    ThankYouReview,
}

impl EmailType {
    pub const ALL: [EmailType; 3] = [
        EmailType::CheckInInstructions,
        EmailType::CheckoutReminder,
        EmailType::ThankYouReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmailType::CheckInInstructions => "check_in_instructions",
            EmailType::CheckoutReminder => "checkout_reminder",
            EmailType::ThankYouReview => "thank_you_review",
        }
    }
}

impl fmt::Display for EmailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for EmailType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "check_in_instructions" => Ok(EmailType::CheckInInstructions),
            "checkout_reminder" => Ok(EmailType::CheckoutReminder),
            "thank_you_review" => Ok(EmailType::ThankYouReview),
            _ => Err(UnknownVariant { kind: "email type", value }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Pending,
    /// Claimed by a processor run and currently being dispatched.
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "pending",
            EmailStatus::Processing => "processing",
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
            EmailStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for EmailStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(EmailStatus::Pending),
            "processing" => Ok(EmailStatus::Processing),
            "sent" => Ok(EmailStatus::Sent),
            "failed" => Ok(EmailStatus::Failed),
            "cancelled" => Ok(EmailStatus::Cancelled),
            _ => Err(UnknownVariant { kind: "email status", value }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ScheduledEmail {
    pub id: String,
    pub booking_id: String,
    #[sqlx(try_from = "String")]
    pub email_type: EmailType,
    pub recipient_email: String,
    pub recipient_name: String,
    pub scheduled_for: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: EmailStatus,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub message_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledEmail {
    pub fn new(
        booking_id: String,
        email_type: EmailType,
        recipient_email: String,
        recipient_name: String,
        scheduled_for: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id,
            email_type,
            recipient_email,
            recipient_name,
            scheduled_for,
            status: EmailStatus::Pending,
            retry_count: 0,
            error_message: None,
            message_id: None,
            sent_at: None,
            claimed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
