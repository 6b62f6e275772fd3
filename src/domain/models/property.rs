use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::FromRow;
use uuid::Uuid;

/// Rental unit owning a calendar. Maintained by the property management side; read-only here.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Property {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub timezone: String,
    pub check_in_instructions: Option<String>,
    pub default_cleaning_cost: Option<f64>,
    pub review_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Property {
    pub fn new(name: String, timezone: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            address: None,
            timezone,
            check_in_instructions: None,
            default_cleaning_cost: None,
            review_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}
