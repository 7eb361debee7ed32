//! Integration tests for scanner lookups and redemption history.

use chrono::Duration;

use ticketgate_core::error::ErrorKind;
use ticketgate_core::types::{AttractionId, PageRequest, UserId};
use ticketgate_entity::redemption::RejectReason;
use ticketgate_entity::ticket::TicketStatus;

use crate::helpers::{TestApp, item, scan};

#[tokio::test]
async fn test_lookup_reports_entitlements() {
    let app = TestApp::new();
    let [coaster, aquarium] = app.rides;
    let ticket = app
        .issued_ticket(vec![item(coaster, 6, None), item(aquarium, 2, None)])
        .await;
    app.engine.redeem(scan(&ticket.ticket_code, coaster, 2)).await.unwrap();

    let snapshot = app.lookup.lookup(&ticket.ticket_code.to_lowercase()).await.unwrap();

    assert_eq!(snapshot.ticket_id, ticket.id);
    assert_eq!(snapshot.status, TicketStatus::Active);
    assert_eq!(snapshot.used_count, 2);
    assert_eq!(snapshot.summary.total_qty, 8);
    assert_eq!(snapshot.summary.remaining_qty, 6);
    assert!((snapshot.summary.usage_percentage - 25.0).abs() < f64::EPSILON);

    let coaster_entry = snapshot.attraction(coaster).unwrap();
    assert_eq!(coaster_entry.name, "Roller Coaster");
    assert_eq!(coaster_entry.remaining_qty, 4);
    assert!(coaster_entry.can_redeem);
    assert_eq!(snapshot.attraction(aquarium).unwrap().name, "Aquarium");
}

#[tokio::test]
async fn test_lookup_unknown_code_is_not_found() {
    let app = TestApp::new();
    let err = app.lookup.lookup("TKT-20250701-UNKNOWN0").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_lookup_does_not_consume() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 2, None)]).await;

    for _ in 0..3 {
        app.lookup.validate(&ticket.ticket_code, Some(coaster)).await.unwrap();
    }

    assert_eq!(app.line(&ticket, coaster).await.remaining_qty, 2);
    assert!(app.store.attempts().await.is_empty());
}

#[tokio::test]
async fn test_validate_active_ticket() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 2, None)]).await;

    let report = app.lookup.validate(&ticket.ticket_code, Some(coaster)).await.unwrap();

    assert!(report.is_valid);
    assert!(report.errors.is_empty());
    assert_eq!(report.attraction.unwrap().remaining_qty, 2);
}

#[tokio::test]
async fn test_validate_reports_exhausted_attraction() {
    let app = TestApp::new();
    let [coaster, aquarium] = app.rides;
    let ticket = app
        .issued_ticket(vec![item(coaster, 1, None), item(aquarium, 1, None)])
        .await;
    app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();

    let report = app.lookup.validate(&ticket.ticket_code, Some(coaster)).await.unwrap();
    assert!(!report.is_valid);
    assert_eq!(
        report.errors,
        vec!["All entries for this attraction have been used".to_string()]
    );

    let elsewhere = app.lookup.validate(&ticket.ticket_code, Some(aquarium)).await.unwrap();
    assert!(elsewhere.is_valid);

    let unknown = app
        .lookup
        .validate(&ticket.ticket_code, Some(AttractionId::new()))
        .await
        .unwrap();
    assert!(!unknown.is_valid);
    assert!(unknown.attraction.is_none());
}

#[tokio::test]
async fn test_validate_cancelled_and_expired() {
    let app = TestApp::new();
    let coaster = app.rides[0];

    let cancelled = app.issued_ticket(vec![item(coaster, 1, None)]).await;
    app.engine.cancel(&cancelled.ticket_code).await.unwrap();
    let report = app.lookup.validate(&cancelled.ticket_code, None).await.unwrap();
    assert!(!report.is_valid);
    assert!(report.errors.contains(&"Ticket has been cancelled".to_string()));
    assert!(!report.snapshot.attractions[0].can_redeem);

    let stale = app.issued_ticket(vec![item(coaster, 1, None)]).await;
    app.clock.advance(Duration::days(400));
    let report = app.lookup.validate(&stale.ticket_code, None).await.unwrap();
    assert!(!report.is_valid);
    assert!(report.errors.iter().any(|e| e.starts_with("Ticket validity has expired")));
}

#[tokio::test]
async fn test_history_by_scanner_is_paginated_newest_first() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 10, None)]).await;
    let operator = UserId::new();

    for _ in 0..5 {
        let mut request = scan(&ticket.ticket_code, coaster, 1);
        request.scanner_user_id = operator;
        app.engine.redeem(request).await.unwrap();
        app.clock.advance(Duration::minutes(1));
    }
    app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();

    let first = app
        .history
        .for_scanner(operator, &PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(first.total_items, 5);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.items.len(), 2);
    assert!(first.items[0].recorded_at > first.items[1].recorded_at);
    assert_eq!(first.items[0].remaining_qty, Some(5));

    let last = app
        .history
        .for_scanner(operator, &PageRequest::new(3, 2))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].remaining_qty, Some(9));
}

#[tokio::test]
async fn test_history_for_ticket_includes_rejections() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 1, None)]).await;

    app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();
    app.clock.advance(Duration::minutes(1));
    app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();

    let attempts = app.history.for_ticket(&ticket.ticket_code).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].reject_reason, Some(RejectReason::TicketInvalid));
    assert!(attempts[1].is_redeemed());
}
