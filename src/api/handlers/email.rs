use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::EmailStatusQuery;
use crate::domain::models::scheduled_email::EmailStatus;
use crate::error::AppError;
use std::sync::Arc;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

pub async fn list_booking_emails(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.booking_service.get(&booking_id).await?;
    let emails = state.email_repo.list_by_booking(&booking_id).await?;
    Ok(Json(emails))
}

pub async fn list_emails_by_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailStatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = match query.status {
        Some(raw) => EmailStatus::try_from(raw).map_err(|e| AppError::Validation(e.to_string()))?,
        None => EmailStatus::Pending,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let emails = state.email_repo.list_by_status(status, limit).await?;
    Ok(Json(emails))
}

pub async fn retry_email(
    State(state): State<Arc<AppState>>,
    Path(email_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let email = state.email_processor.retry_failed(&email_id).await?;
    Ok(Json(email))
}
