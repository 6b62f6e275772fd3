use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Dates overlap with an existing booking for {guest_name}")]
    Conflict { guest_name: String, booking_id: String },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Mail dispatch failed: {0}")]
    TransientDispatch(String),
    #[error("Derived record update failed: {0}")]
    DerivedState(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    pub fn conflict_with(guest_name: &str, booking_id: &str) -> Self {
        AppError::Conflict {
            guest_name: guest_name.to_string(),
            booking_id: booking_id.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                if let Some(db_err) = e.as_database_error() {
                    let code = db_err.code().unwrap_or_default();

                    // 2067 = SQLite Unique Constraint
                    // 23505 = PostgreSQL Unique Violation
                    if code == "2067" || code == "23505" {
                        return (
                            StatusCode::CONFLICT,
                            Json(json!({ "error": "Resource already exists (duplicate entry)" }))
                        ).into_response();
                    }
                }

                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict { guest_name, booking_id } => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({
                        "error": self.to_string(),
                        "conflicting_guest": guest_name,
                        "conflicting_booking_id": booking_id,
                    }))
                ).into_response();
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::TransientDispatch(msg) => {
                error!("Mail dispatch error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Mail service unavailable".to_string())
            }
            AppError::DerivedState(msg) => {
                error!("Derived state error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
