pub mod booking;
pub mod cleaning;
pub mod events;
pub mod property;
pub mod scheduled_email;

use thiserror::Error;

/// Raised when a stored status/type column holds a value the enum does not know.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
