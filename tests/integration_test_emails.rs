mod common;

use chrono::Duration;
use common::{booking_params, june, MailBehavior, TestApp};
use rental_backend::domain::models::booking::{BookingPatch, BookingStatus};
use rental_backend::domain::ports::Clock;
use rental_backend::domain::models::scheduled_email::{EmailStatus, EmailType, ScheduledEmail};
use rental_backend::domain::services::email_processor::{idempotency_key, ProcessReport};
use rental_backend::error::AppError;
use std::collections::HashMap;

async fn emails(app: &TestApp, booking_id: &str) -> Vec<ScheduledEmail> {
    app.state.email_repo.list_by_booking(booking_id).await.unwrap()
}

fn live_by_type(all: &[ScheduledEmail]) -> HashMap<EmailType, Vec<&ScheduledEmail>> {
    let mut map: HashMap<EmailType, Vec<&ScheduledEmail>> = HashMap::new();
    for email in all.iter().filter(|e| e.status != EmailStatus::Cancelled) {
        map.entry(email.email_type).or_default().push(email);
    }
    map
}

#[tokio::test]
async fn test_confirmed_booking_schedules_three_emails() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    let all = emails(&app, &alice.id).await;
    assert_eq!(all.len(), 3);
    let live = live_by_type(&all);
    assert_eq!(live[&EmailType::CheckInInstructions][0].scheduled_for, june(4, 15));
    assert_eq!(live[&EmailType::CheckoutReminder][0].scheduled_for, june(9, 11));
    assert_eq!(live[&EmailType::ThankYouReview][0].scheduled_for, june(12, 11));
    assert!(all.iter().all(|e| e.status == EmailStatus::Pending && e.recipient_email == "alice@example.com"));
}

#[tokio::test]
async fn test_booking_without_email_schedules_nothing() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let mut params = booking_params(&property.id, "Alice", june(6, 15), june(10, 11));
    params.guest_email = Some("   ".into());
    let alice = app.state.booking_service.create(params).await.unwrap();

    assert!(emails(&app, &alice.id).await.is_empty());
}

#[tokio::test]
async fn test_past_candidates_are_dropped_but_review_is_kept() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    app.clock.set(june(8, 0));

    // Entered after check-in already happened.
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();
    let all = emails(&app, &alice.id).await;
    let types: Vec<_> = all.iter().map(|e| e.email_type).collect();
    assert!(types.contains(&EmailType::CheckoutReminder));
    assert!(types.contains(&EmailType::ThankYouReview));
    assert!(!types.contains(&EmailType::CheckInInstructions));
}

#[tokio::test]
async fn test_date_change_supersedes_pending_emails() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    app.state.booking_service
        .update(&alice.id, BookingPatch { check_out: Some(june(12, 11)), ..Default::default() })
        .await
        .unwrap();
    app.state.booking_service
        .update(&alice.id, BookingPatch { check_out: Some(june(13, 11)), ..Default::default() })
        .await
        .unwrap();

    let all = emails(&app, &alice.id).await;
    let live = live_by_type(&all);
    for email_type in EmailType::ALL {
        assert_eq!(live[&email_type].len(), 1, "one live {} email", email_type);
    }
    assert_eq!(live[&EmailType::CheckoutReminder][0].scheduled_for, june(12, 11));
    assert_eq!(live[&EmailType::ThankYouReview][0].scheduled_for, june(15, 11));
    // Check-in did not move, so its record was kept rather than replaced.
    assert_eq!(all.iter().filter(|e| e.email_type == EmailType::CheckInInstructions).count(), 1);
}

#[tokio::test]
async fn test_reconfirmation_is_idempotent() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    app.state.booking_service.reconcile(app.clock.now()).await.unwrap();
    app.state.booking_service.reconcile(app.clock.now()).await.unwrap();

    assert_eq!(emails(&app, &alice.id).await.len(), 3);
}

#[tokio::test]
async fn test_cancellation_cancels_pending_emails() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    app.state.booking_service
        .update(&alice.id, BookingPatch { status: Some(BookingStatus::Cancelled), ..Default::default() })
        .await
        .unwrap();

    let all = emails(&app, &alice.id).await;
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|e| e.status == EmailStatus::Cancelled));

    app.clock.set(june(20, 0));
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.processed, 0);
    assert!(app.mail.sent().is_empty());
}

#[tokio::test]
async fn test_delete_cancels_pending_emails_and_keeps_history() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    app.state.booking_service.delete(&alice.id).await.unwrap();

    let all = emails(&app, &alice.id).await;
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|e| e.status == EmailStatus::Cancelled));
}

#[tokio::test]
async fn test_due_emails_are_sent_in_order() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    app.clock.set(june(5, 0));
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report, ProcessReport { processed: 1, sent: 1, ..Default::default() });

    let sent = app.mail.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "alice@example.com");
    assert!(sent[0].subject.contains("Seaside Loft"));
    assert!(sent[0].html_body.contains("Key box code 4711"));

    let check_in = emails(&app, &alice.id).await.into_iter()
        .find(|e| e.email_type == EmailType::CheckInInstructions)
        .unwrap();
    assert_eq!(check_in.status, EmailStatus::Sent);
    assert!(check_in.message_id.is_some());
    assert_eq!(check_in.sent_at, Some(june(5, 0)));
    assert_eq!(sent[0].idempotency_key.as_deref(), Some(idempotency_key(&check_in.id).as_str()));

    app.clock.set(june(20, 0));
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.sent, 2);

    // Nothing left to do.
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.processed, 0);
}

#[tokio::test]
async fn test_fourth_failure_is_final() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();
    app.mail.always(Some(MailBehavior::Fail));
    app.clock.set(june(13, 0));

    for attempt in 1..=3 {
        let report = app.state.email_processor.process_pending_emails().await.unwrap();
        assert_eq!(report.retried, 3, "attempt {}", attempt);
        for email in emails(&app, &alice.id).await {
            assert_eq!(email.status, EmailStatus::Pending);
            assert_eq!(email.retry_count, attempt);
            assert_eq!(email.scheduled_for, app.clock.now() + Duration::hours(24));
            assert!(email.error_message.is_some());
        }
        app.clock.advance(Duration::hours(25));
    }

    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.failed, 3);
    for email in emails(&app, &alice.id).await {
        assert_eq!(email.status, EmailStatus::Failed);
        assert_eq!(email.retry_count, 4);
    }

    app.clock.advance(Duration::days(10));
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.processed, 0);
    assert!(app.mail.sent().is_empty());
}

#[tokio::test]
async fn test_timeout_counts_as_failure() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();
    app.mail.push(MailBehavior::Hang);

    app.clock.set(june(5, 0));
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.retried, 1);

    let check_in = emails(&app, &alice.id).await.into_iter()
        .find(|e| e.email_type == EmailType::CheckInInstructions)
        .unwrap();
    assert_eq!(check_in.status, EmailStatus::Pending);
    assert_eq!(check_in.retry_count, 1);
    assert!(check_in.error_message.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_concurrent_processors_never_double_send() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    for (i, day) in [1u32, 8, 15, 22].into_iter().enumerate() {
        app.book(&property.id, &format!("Guest{}", i), june(day, 15), june(day + 4, 11)).await.unwrap();
    }
    app.clock.set(june(30, 0));

    let processor = app.state.email_processor.clone();
    let (a, b) = tokio::join!(processor.process_pending_emails(), processor.process_pending_emails());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.sent + b.sent, 12);
    assert_eq!(app.mail.sent().len(), 12);
}

#[tokio::test]
async fn test_stale_claim_is_released_after_lease() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    app.clock.set(june(5, 0));
    // A worker claims and then dies.
    let claimed = app.state.email_repo.claim_due(app.clock.now(), 10).await.unwrap();
    assert_eq!(claimed.len(), 1);

    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.processed, 0, "claim still within its lease");

    app.clock.advance(Duration::minutes(16));
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.sent, 1);
}

#[tokio::test]
async fn test_email_of_cancelled_booking_is_skipped_at_dispatch() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    app.clock.set(june(5, 0));
    app.state.email_repo.claim_due(app.clock.now(), 10).await.unwrap();
    app.state.booking_service
        .update(&alice.id, BookingPatch { status: Some(BookingStatus::Cancelled), ..Default::default() })
        .await
        .unwrap();

    app.clock.advance(Duration::minutes(16));
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.skipped, 1);
    assert!(app.mail.sent().is_empty());
    assert!(emails(&app, &alice.id).await.iter().all(|e| e.status == EmailStatus::Cancelled));
}

#[tokio::test]
async fn test_sent_email_is_not_rescheduled_after_date_change() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    app.clock.set(june(5, 0));
    app.state.email_processor.process_pending_emails().await.unwrap();

    app.state.booking_service
        .update(&alice.id, BookingPatch { check_in: Some(june(7, 15)), ..Default::default() })
        .await
        .unwrap();

    let check_ins: Vec<_> = emails(&app, &alice.id).await.into_iter()
        .filter(|e| e.email_type == EmailType::CheckInInstructions)
        .collect();
    assert_eq!(check_ins.len(), 1);
    assert_eq!(check_ins[0].status, EmailStatus::Sent);
}

#[tokio::test]
async fn test_manual_retry_requeues_failed_email() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(6, 15), june(10, 11)).await.unwrap();

    app.clock.set(june(5, 0));
    app.mail.always(Some(MailBehavior::Fail));
    for _ in 0..4 {
        app.state.email_processor.process_pending_emails().await.unwrap();
        app.clock.advance(Duration::hours(25));
    }
    let failed = app.state.email_repo.list_by_status(EmailStatus::Failed, 10).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].booking_id, alice.id);

    let requeued = app.state.email_processor.retry_failed(&failed[0].id).await.unwrap();
    assert_eq!(requeued.status, EmailStatus::Pending);
    assert_eq!(requeued.retry_count, 0);
    assert_eq!(requeued.scheduled_for, app.clock.now());

    app.mail.always(None);
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert!(report.sent >= 1);
    let record = app.state.email_repo.find_by_id(&failed[0].id).await.unwrap().unwrap();
    assert_eq!(record.status, EmailStatus::Sent);

    let err = app.state.email_processor.retry_failed(&failed[0].id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let err = app.state.email_processor.retry_failed("missing").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_date_move_that_clears_address_cancels_pending_emails() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(10, 15), june(15, 11)).await.unwrap();

    app.state.booking_service
        .update(&alice.id, BookingPatch {
            check_in: Some(june(20, 15)),
            check_out: Some(june(25, 11)),
            guest_email: Some(String::new()),
            ..Default::default()
        })
        .await
        .unwrap();

    let all = emails(&app, &alice.id).await;
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|e| e.status == EmailStatus::Cancelled));

    app.clock.set(june(30, 0));
    let report = app.state.email_processor.process_pending_emails().await.unwrap();
    assert_eq!(report.processed, 0);
    assert!(app.mail.sent().is_empty());
}

#[tokio::test]
async fn test_reconcile_cancels_emails_of_booking_without_address() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(10, 15), june(15, 11)).await.unwrap();

    // Clear the address behind the service's back, as a manual DB edit would.
    sqlx::query("UPDATE bookings SET guest_email = NULL WHERE id = ?")
        .bind(&alice.id)
        .execute(&app.pool)
        .await
        .unwrap();
    app.state.booking_service.reconcile(app.clock.now()).await.unwrap();

    assert!(emails(&app, &alice.id).await.iter().all(|e| e.status == EmailStatus::Cancelled));
}

#[tokio::test]
async fn test_address_change_readdresses_pending_emails() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(10, 15), june(15, 11)).await.unwrap();

    app.state.booking_service
        .update(&alice.id, BookingPatch {
            guest_email: Some("alice.new@example.com".into()),
            guest_name: Some("Alice Liddell".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let all = emails(&app, &alice.id).await;
    let live = live_by_type(&all);
    for email_type in EmailType::ALL {
        let current = &live[&email_type];
        assert_eq!(current.len(), 1, "one live {} email", email_type);
        assert_eq!(current[0].recipient_email, "alice.new@example.com");
        assert_eq!(current[0].recipient_name, "Alice Liddell");
    }
    assert_eq!(live[&EmailType::CheckoutReminder][0].scheduled_for, june(14, 11));
    assert!(all
        .iter()
        .filter(|e| e.recipient_email == "alice@example.com")
        .all(|e| e.status == EmailStatus::Cancelled));
}

#[tokio::test]
async fn test_return_to_pending_cancels_pending_emails() {
    let app = TestApp::new().await;
    let property = app.seed_property("Seaside Loft").await;
    let alice = app.book(&property.id, "Alice", june(10, 15), june(15, 11)).await.unwrap();

    app.state.booking_service
        .update(&alice.id, BookingPatch {
            status: Some(BookingStatus::Pending),
            check_out: Some(june(18, 11)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(emails(&app, &alice.id).await.iter().all(|e| e.status == EmailStatus::Cancelled));

    app.state.booking_service
        .update(&alice.id, BookingPatch { status: Some(BookingStatus::Confirmed), ..Default::default() })
        .await
        .unwrap();

    let all = emails(&app, &alice.id).await;
    let live = live_by_type(&all);
    for email_type in EmailType::ALL {
        assert_eq!(live[&email_type].len(), 1, "one live {} email", email_type);
    }
    assert_eq!(live[&EmailType::CheckoutReminder][0].scheduled_for, june(17, 11));
}
