use axum::{extract::{State, Path}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{CreateBookingRequest, UpdateBookingRequest};
use crate::api::dtos::responses::DeletedResponse;
use crate::domain::models::booking::NewBookingParams;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<String>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!(property_id = %property_id, "create_booking");

    let created = state.booking_service.create(NewBookingParams {
        property_id,
        guest_name: payload.guest_name,
        guest_email: payload.guest_email,
        guest_phone: payload.guest_phone,
        check_in: payload.check_in,
        check_out: payload.check_out,
        status: payload.status,
        booking_platform: payload.booking_platform,
        total_amount: payload.total_amount,
        notes: payload.notes,
    }).await?;

    Ok(Json(created))
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.property_repo.find_by_id(&property_id).await?
        .ok_or(AppError::NotFound(format!("Property {} not found", property_id)))?;

    let bookings = state.booking_service.list_by_property(&property_id).await?;
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.booking_service.get(&booking_id).await?;
    Ok(Json(booking))
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Json(payload): Json<UpdateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.booking_service.update(&booking_id, payload.into()).await?;
    Ok(Json(updated))
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.booking_service.delete(&booking_id).await?;
    Ok(Json(DeletedResponse { id: booking_id, status: "deleted" }))
}
