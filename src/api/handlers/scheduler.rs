use axum::{extract::State, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::responses::ReconcileResponse;
use crate::error::AppError;
use std::sync::Arc;

pub async fn process_emails(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.email_processor.process_pending_emails().await?;
    Ok(Json(report))
}

pub async fn reconcile(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let replayed = state.booking_service.reconcile(state.clock.now()).await?;
    Ok(Json(ReconcileResponse { replayed }))
}
