use axum::{
    body::Body,
    extract::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{health, booking, cleaning, email, scheduler};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Property calendars
        .route("/api/v1/properties/{property_id}/bookings", post(booking::create_booking).get(booking::list_bookings))
        .route("/api/v1/properties/{property_id}/cleanings", get(cleaning::list_cleanings))

        // Bookings
        .route("/api/v1/bookings/{booking_id}", get(booking::get_booking).put(booking::update_booking).delete(booking::delete_booking))
        .route("/api/v1/bookings/{booking_id}/emails", get(email::list_booking_emails))

        // Scheduled emails
        .route("/api/v1/emails", get(email::list_emails_by_status))
        .route("/api/v1/emails/{email_id}/retry", post(email::retry_email))

        // Scheduler triggers
        .route("/api/v1/scheduler/process-emails", post(scheduler::process_emails))
        .route("/api/v1/scheduler/reconcile", post(scheduler::reconcile))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
