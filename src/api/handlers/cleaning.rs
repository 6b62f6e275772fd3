use axum::{extract::{State, Path}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;

pub async fn list_cleanings(
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.property_repo.find_by_id(&property_id).await?
        .ok_or(AppError::NotFound(format!("Property {} not found", property_id)))?;

    let tasks = state.cleaning_repo.list_by_property(&property_id).await?;
    Ok(Json(tasks))
}
