//! Integration tests for gate redemption and cancellation.

use chrono::Duration;

use ticketgate_core::config::{IssuanceConfig, ValidityPolicy};
use ticketgate_core::error::ErrorKind;
use ticketgate_core::types::AttractionId;
use ticketgate_entity::redemption::{RedemptionResult, RejectReason};
use ticketgate_entity::ticket::TicketStatus;

use crate::helpers::{self, TestApp, item, july, scan};

#[tokio::test]
async fn test_redeem_decrements_quota() {
    let app = TestApp::new();
    let [coaster, aquarium] = app.rides;
    let ticket = app
        .issued_ticket(vec![item(coaster, 5, None), item(aquarium, 2, None)])
        .await;

    let outcome = app.engine.redeem(scan(&ticket.ticket_code, coaster, 2)).await.unwrap();

    assert!(outcome.is_redeemed());
    assert_eq!(outcome.reject_reason, None);
    assert_eq!(outcome.remaining_qty, Some(3));
    assert_eq!(outcome.ticket_status, Some(TicketStatus::Active));
    assert!(!outcome.replayed);

    let line = app.line(&ticket, coaster).await;
    assert_eq!((line.total_qty, line.used_qty, line.remaining_qty), (5, 2, 3));
    assert_eq!(app.line(&ticket, aquarium).await.remaining_qty, 2);

    let reloaded = app.reload(&ticket).await;
    assert_eq!(reloaded.used_count, 2);
    assert_eq!(reloaded.last_used_at, Some(helpers::opening_time()));
}

#[tokio::test]
async fn test_consuming_every_line_marks_ticket_used() {
    let app = TestApp::new();
    let [coaster, aquarium] = app.rides;
    let ticket = app
        .issued_ticket(vec![item(coaster, 2, None), item(aquarium, 1, None)])
        .await;

    let first = app.engine.redeem(scan(&ticket.ticket_code, coaster, 2)).await.unwrap();
    assert_eq!(first.remaining_qty, Some(0));
    assert_eq!(first.ticket_status, Some(TicketStatus::Active));

    let last = app.engine.redeem(scan(&ticket.ticket_code, aquarium, 1)).await.unwrap();
    assert!(last.is_redeemed());
    assert_eq!(last.ticket_status, Some(TicketStatus::Used));
    assert_eq!(app.reload(&ticket).await.status, TicketStatus::Used);

    let after = app.engine.redeem(scan(&ticket.ticket_code, aquarium, 1)).await.unwrap();
    assert_eq!(after.outcome, RedemptionResult::Rejected);
    assert_eq!(after.reject_reason, Some(RejectReason::TicketInvalid));
    assert_eq!(after.ticket_status, Some(TicketStatus::Used));
}

#[tokio::test]
async fn test_over_request_is_rejected_without_consuming() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 3, None)]).await;

    let outcome = app.engine.redeem(scan(&ticket.ticket_code, coaster, 4)).await.unwrap();

    assert_eq!(outcome.outcome, RedemptionResult::Rejected);
    assert_eq!(outcome.reject_reason, Some(RejectReason::QuotaExhausted));
    assert_eq!(outcome.remaining_qty, Some(3));
    assert_eq!(app.line(&ticket, coaster).await.used_qty, 0);
    assert_eq!(app.reload(&ticket).await.used_count, 0);
}

#[tokio::test]
async fn test_large_group_is_admitted_in_one_scan() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 150, None)]).await;

    let outcome = app.engine.redeem(scan(&ticket.ticket_code, coaster, 120)).await.unwrap();

    assert!(outcome.is_redeemed());
    assert_eq!(outcome.remaining_qty, Some(30));
    assert_eq!(app.line(&ticket, coaster).await.used_qty, 120);
    assert_eq!(app.store.attempts().await.len(), 1);
}

#[tokio::test]
async fn test_huge_request_is_recorded_as_exhausted() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 150, None)]).await;

    let outcome = app.engine.redeem(scan(&ticket.ticket_code, coaster, 5_000)).await.unwrap();

    assert_eq!(outcome.reject_reason, Some(RejectReason::QuotaExhausted));
    assert_eq!(outcome.remaining_qty, Some(150));
    let attempts = app.store.attempts().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].requested_qty, 5_000);
}

#[tokio::test]
async fn test_unknown_code_is_recorded() {
    let app = TestApp::new();

    let outcome = app
        .engine
        .redeem(scan("TKT-20250701-NOSUCH00", app.rides[0], 1))
        .await
        .unwrap();

    assert_eq!(outcome.reject_reason, Some(RejectReason::TicketNotFound));
    assert_eq!(outcome.remaining_qty, None);
    assert_eq!(outcome.ticket_status, None);

    let attempts = app.store.attempts().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].ticket_id, None);
    assert_eq!(attempts[0].ticket_code, "TKT-20250701-NOSUCH00");
}

#[tokio::test]
async fn test_attraction_not_on_ticket() {
    let app = TestApp::new();
    let ticket = app.issued_ticket(vec![item(app.rides[0], 3, None)]).await;

    let outcome = app
        .engine
        .redeem(scan(&ticket.ticket_code, AttractionId::new(), 1))
        .await
        .unwrap();

    assert_eq!(outcome.reject_reason, Some(RejectReason::LineNotFound));
    assert_eq!(outcome.remaining_qty, None);
    assert_eq!(outcome.ticket_status, Some(TicketStatus::Active));
}

#[tokio::test]
async fn test_scan_after_validity_expires_ticket() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 3, None)]).await;

    app.clock.advance(Duration::days(366));
    let outcome = app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();

    assert_eq!(outcome.reject_reason, Some(RejectReason::TicketExpired));
    assert_eq!(outcome.ticket_status, Some(TicketStatus::Expired));
    assert_eq!(outcome.remaining_qty, Some(3));
    assert_eq!(app.reload(&ticket).await.status, TicketStatus::Expired);

    let again = app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();
    assert_eq!(again.reject_reason, Some(RejectReason::TicketInvalid));
    assert_eq!(app.line(&ticket, coaster).await.remaining_qty, 3);
}

#[tokio::test]
async fn test_scan_before_visit_date_is_not_yet_valid() {
    let app = TestApp::with_config(
        IssuanceConfig {
            validity_policy: ValidityPolicy::VisitDate,
            ..IssuanceConfig::default()
        },
        helpers::fast_redemption(),
    );
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 2, Some(july(4)))]).await;

    let early = app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();
    assert_eq!(early.reject_reason, Some(RejectReason::TicketNotYetValid));
    assert_eq!(app.reload(&ticket).await.status, TicketStatus::Active);

    app.clock.advance(Duration::days(3));
    let on_the_day = app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();
    assert!(on_the_day.is_redeemed());
}

#[tokio::test]
async fn test_same_key_replays_recorded_outcome() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 5, None)]).await;
    let request = scan(&ticket.ticket_code, coaster, 2);

    let first = app.engine.redeem(request.clone()).await.unwrap();
    app.clock.advance(Duration::minutes(1));
    let second = app.engine.redeem(request.clone()).await.unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(first.attempt_id, second.attempt_id);
    assert_eq!(second.remaining_qty, Some(3));
    assert_eq!(app.line(&ticket, coaster).await.remaining_qty, 3);
    assert_eq!(app.store.attempts().await.len(), 1);
}

#[tokio::test]
async fn test_reused_key_with_other_arguments_replays_original() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 5, None)]).await;
    let request = scan(&ticket.ticket_code, coaster, 1);

    let first = app.engine.redeem(request.clone()).await.unwrap();
    let mut altered = request;
    altered.requested_qty = 3;
    let second = app.engine.redeem(altered).await.unwrap();

    assert_eq!(second.attempt_id, first.attempt_id);
    assert_eq!(second.remaining_qty, Some(4));
    assert_eq!(app.line(&ticket, coaster).await.remaining_qty, 4);
}

#[tokio::test]
async fn test_rejection_is_replayed_too() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 1, None)]).await;
    let request = scan(&ticket.ticket_code, coaster, 2);

    let first = app.engine.redeem(request.clone()).await.unwrap();
    let second = app.engine.redeem(request).await.unwrap();

    assert_eq!(first.reject_reason, Some(RejectReason::QuotaExhausted));
    assert_eq!(second.reject_reason, Some(RejectReason::QuotaExhausted));
    assert_eq!(first.attempt_id, second.attempt_id);
}

#[tokio::test]
async fn test_code_is_matched_case_insensitively() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 2, None)]).await;

    let typed = format!("  {}  ", ticket.ticket_code.to_lowercase());
    let outcome = app.engine.redeem(scan(&typed, coaster, 1)).await.unwrap();

    assert!(outcome.is_redeemed());
    assert_eq!(app.store.attempts().await[0].ticket_code, ticket.ticket_code);
}

#[tokio::test]
async fn test_invalid_requests_record_nothing() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 2, None)]).await;

    let zero = scan(&ticket.ticket_code, coaster, 0);
    assert_eq!(app.engine.redeem(zero).await.unwrap_err().kind, ErrorKind::Validation);

    let negative = scan(&ticket.ticket_code, coaster, -1);
    assert_eq!(app.engine.redeem(negative).await.unwrap_err().kind, ErrorKind::Validation);

    let mut no_key = scan(&ticket.ticket_code, coaster, 1);
    no_key.idempotency_key = String::new();
    assert_eq!(app.engine.redeem(no_key).await.unwrap_err().kind, ErrorKind::Validation);

    let blank = scan("   ", coaster, 1);
    assert_eq!(app.engine.redeem(blank).await.unwrap_err().kind, ErrorKind::Validation);

    assert!(app.store.attempts().await.is_empty());
}

#[tokio::test]
async fn test_cancel_unused_ticket() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 2, None)]).await;

    let cancelled = app.engine.cancel(&ticket.ticket_code).await.unwrap();
    assert_eq!(cancelled.status, TicketStatus::Cancelled);

    let again = app.engine.cancel(&ticket.ticket_code).await.unwrap();
    assert_eq!(again.status, TicketStatus::Cancelled);

    let outcome = app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();
    assert_eq!(outcome.reject_reason, Some(RejectReason::TicketInvalid));
    assert_eq!(outcome.ticket_status, Some(TicketStatus::Cancelled));
}

#[tokio::test]
async fn test_cancel_after_redemption_conflicts() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 2, None)]).await;
    app.engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();

    let err = app.engine.cancel(&ticket.ticket_code).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(app.reload(&ticket).await.status, TicketStatus::Active);
}

#[tokio::test]
async fn test_cancel_unknown_ticket_is_not_found() {
    let app = TestApp::new();
    let err = app.engine.cancel("TKT-20250701-MISSING0").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
