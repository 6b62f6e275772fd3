mod common;

use axum::http::StatusCode;
use common::{june, TestApp};
use serde_json::json;

fn stay(guest: &str, check_in: &str, check_out: &str) -> serde_json::Value {
    json!({
        "guest_name": guest,
        "guest_email": format!("{}@example.com", guest.to_lowercase()),
        "check_in": check_in,
        "check_out": check_out,
        "booking_platform": "booking.com",
        "total_amount": 612.5
    })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.request("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_booking_crud_flow() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let base = format!("/api/v1/properties/{}/bookings", property.id);

    let (status, created) = app.request("POST", &base, Some(stay("Alice", "2030-06-01T15:00:00Z", "2030-06-05T11:00:00Z"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "confirmed");
    assert_eq!(created["booking_platform"], "booking.com");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, list) = app.request("GET", &base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, updated) = app.request("PUT", &format!("/api/v1/bookings/{}", id), Some(json!({
        "notes": "Travelling with a dog",
        "check_out": "2030-06-06T11:00:00Z"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["notes"], "Travelling with a dog");

    let (status, fetched) = app.request("GET", &format!("/api/v1/bookings/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["notes"], "Travelling with a dog");

    let (status, cleanings) = app.request("GET", &format!("/api/v1/properties/{}/cleanings", property.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let cleanings = cleanings.as_array().unwrap();
    assert_eq!(cleanings.iter().filter(|t| t["status"] == "scheduled").count(), 1);
    assert_eq!(cleanings.iter().filter(|t| t["status"] == "cancelled").count(), 1);

    let (status, emails) = app.request("GET", &format!("/api/v1/bookings/{}/emails", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(emails.as_array().unwrap().iter().any(|e| e["email_type"] == "checkout_reminder" && e["status"] == "pending"));

    let (status, deleted) = app.request("DELETE", &format!("/api/v1/bookings/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["status"], "deleted");

    let (status, _) = app.request("GET", &format!("/api/v1/bookings/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conflict_and_validation_responses() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let base = format!("/api/v1/properties/{}/bookings", property.id);

    let (_, alice) = app.request("POST", &base, Some(stay("Alice", "2030-06-01T00:00:00Z", "2030-06-05T00:00:00Z"))).await;

    let (status, body) = app.request("POST", &base, Some(stay("Bob", "2030-06-03T00:00:00Z", "2030-06-07T00:00:00Z"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflicting_guest"], "Alice");
    assert_eq!(body["conflicting_booking_id"], alice["id"]);
    assert!(body["error"].as_str().unwrap().contains("Alice"));

    let (status, _) = app.request("POST", &base, Some(stay("Bob", "2030-06-05T00:00:00Z", "2030-06-08T00:00:00Z"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.request("POST", &base, Some(stay("Carol", "2030-07-05T00:00:00Z", "2030-07-01T00:00:00Z"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = app.request("POST", "/api/v1/properties/nope/bookings", Some(stay("Dan", "2030-08-01T00:00:00Z", "2030-08-02T00:00:00Z"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_explicit_null_clears_total_amount() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let base = format!("/api/v1/properties/{}/bookings", property.id);
    let (_, created) = app.request("POST", &base, Some(stay("Alice", "2030-06-01T15:00:00Z", "2030-06-05T11:00:00Z"))).await;
    let uri = format!("/api/v1/bookings/{}", created["id"].as_str().unwrap());

    let (status, body) = app.request("PUT", &uri, Some(json!({ "notes": "Paid on arrival" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_amount"], 612.5);

    let (status, body) = app.request("PUT", &uri, Some(json!({ "total_amount": null }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["total_amount"].is_null());

    let (_, body) = app.request("PUT", &uri, Some(json!({ "total_amount": 700.0 }))).await;
    assert_eq!(body["total_amount"], 700.0);
}

#[tokio::test]
async fn test_cancel_via_status_update() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(1, 0), june(5, 0)).await.unwrap();

    let (status, body) = app.request("PUT", &format!("/api/v1/bookings/{}", alice.id), Some(json!({ "status": "cancelled" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (_, cleanings) = app.request("GET", &format!("/api/v1/properties/{}/cleanings", property.id), None).await;
    assert!(cleanings.as_array().unwrap().iter().all(|t| t["status"] == "cancelled"));

    let (_, emails) = app.request("GET", &format!("/api/v1/bookings/{}/emails", alice.id), None).await;
    assert!(emails.as_array().unwrap().iter().all(|e| e["status"] == "cancelled"));
}

#[tokio::test]
async fn test_scheduler_endpoints_and_status_view() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    let (status, report) = app.request("POST", "/api/v1/scheduler/process-emails", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["processed"], 0);

    let (status, pending) = app.request("GET", "/api/v1/emails?status=pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 3);

    app.clock.set(june(20, 0));
    let (_, report) = app.request("POST", "/api/v1/scheduler/process-emails", None).await;
    assert_eq!(report["sent"], 3);

    let (_, sent) = app.request("GET", "/api/v1/emails?status=sent&limit=2", None).await;
    assert_eq!(sent.as_array().unwrap().len(), 2);

    let (status, _) = app.request("GET", "/api/v1/emails?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.request("POST", "/api/v1/scheduler/reconcile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replayed"], 0, "stay already ended");
}

#[tokio::test]
async fn test_retry_endpoint() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    let emails = app.state.email_repo.list_by_booking(&alice.id).await.unwrap();
    let (status, _) = app.request("POST", &format!("/api/v1/emails/{}/retry", emails[0].id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "pending emails cannot be retried");

    let (status, _) = app.request("POST", "/api/v1/emails/missing/retry", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    sqlx::query("UPDATE scheduled_emails SET status = 'failed', retry_count = 4 WHERE id = ?")
        .bind(&emails[0].id)
        .execute(&app.pool)
        .await
        .unwrap();

    let (status, body) = app.request("POST", &format!("/api/v1/emails/{}/retry", emails[0].id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["retry_count"], 0);
}
