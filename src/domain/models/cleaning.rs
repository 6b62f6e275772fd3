use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;
use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl CleaningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleaningStatus::Scheduled => "scheduled",
            CleaningStatus::InProgress => "in_progress",
            CleaningStatus::Completed => "completed",
            CleaningStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CleaningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CleaningStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "scheduled" => Ok(CleaningStatus::Scheduled),
            "in_progress" => Ok(CleaningStatus::InProgress),
            "completed" => Ok(CleaningStatus::Completed),
            "cancelled" => Ok(CleaningStatus::Cancelled),
            _ => Err(UnknownVariant { kind: "cleaning status", value }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct CleaningTask {
    pub id: String,
    pub property_id: String,
    /// Originating booking. Not a foreign key: the task outlives booking deletion.
    pub booking_id: Option<String>,
    pub cleaning_date: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: CleaningStatus,
    pub cost: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CleaningTask {
    pub fn new(property_id: String, booking_id: Option<String>, cleaning_date: DateTime<Utc>, cost: Option<f64>, notes: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            property_id,
            booking_id,
            cleaning_date,
            status: CleaningStatus::Scheduled,
            cost,
            notes,
            created_at: now,
            updated_at: now,
        }
    }
}
