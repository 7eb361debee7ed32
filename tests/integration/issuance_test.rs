//! Integration tests for ticket issuance and the backfill job.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use ticketgate_core::config::{IssuanceConfig, ValidityPolicy};
use ticketgate_core::error::ErrorKind;
use ticketgate_entity::purchase::TransactionStatus;
use ticketgate_entity::ticket::TicketStatus;
use ticketgate_database::store::TicketStore;
use ticketgate_service::InlinePayloadEncoder;

use crate::helpers::{self, FailingEncoder, TestApp, item, july};

#[tokio::test]
async fn test_issue_creates_one_line_per_attraction() {
    let app = TestApp::new();
    let [coaster, aquarium] = app.rides;

    let ticket = app
        .issued_ticket(vec![
            item(coaster, 2, None),
            item(aquarium, 4, None),
            item(coaster, 3, None),
        ])
        .await;

    assert_eq!(ticket.status, TicketStatus::Active);
    assert_eq!(ticket.used_count, 0);
    assert!(ticket.ticket_code.starts_with("TKT-20250701-"));
    assert_eq!(ticket.ticket_code.len(), "TKT-20250701-".len() + 8);
    assert!(ticket.scan_payload_ref.starts_with("data:text/plain;base64,"));
    assert_eq!(ticket.valid_from, helpers::opening_time());
    assert_eq!(ticket.valid_until, helpers::opening_time() + Duration::days(365));

    let lines = app.store.quota_lines(ticket.id).await.unwrap();
    assert_eq!(lines.len(), 2);

    let coaster_line = app.line(&ticket, coaster).await;
    assert_eq!(coaster_line.total_qty, 5);
    assert_eq!(coaster_line.used_qty, 0);
    assert_eq!(coaster_line.remaining_qty, 5);

    let aquarium_line = app.line(&ticket, aquarium).await;
    assert_eq!(aquarium_line.total_qty, 4);
    assert_eq!(aquarium_line.remaining_qty, 4);
}

#[tokio::test]
async fn test_issue_twice_returns_existing_ticket() {
    let app = TestApp::new();
    let transaction = app
        .purchase(TransactionStatus::Completed, vec![item(app.rides[0], 2, None)])
        .await;

    let first = app.issuer.issue(&transaction).await.unwrap();
    let second = app.issuer.issue_for_transaction(transaction.id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.ticket_code, second.ticket_code);
    assert_eq!(app.store.ticket_count().await, 1);
}

#[tokio::test]
async fn test_concurrent_issue_produces_single_ticket() {
    let app = TestApp::new();
    let transaction = app
        .purchase(TransactionStatus::Completed, vec![item(app.rides[0], 3, None)])
        .await;

    let tasks = (0..8).map(|_| {
        let issuer = app.issuer.clone();
        let transaction = transaction.clone();
        tokio::spawn(async move { issuer.issue(&transaction).await })
    });
    let results = futures::future::join_all(tasks).await;

    let ids: Vec<_> = results
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().id)
        .collect();
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(app.store.ticket_count().await, 1);
}

#[tokio::test]
async fn test_issue_requires_completed_transaction() {
    let app = TestApp::new();

    for status in [TransactionStatus::Pending, TransactionStatus::Processing, TransactionStatus::Refunded] {
        let transaction = app.purchase(status, vec![item(app.rides[0], 1, None)]).await;
        let err = app.issuer.issue(&transaction).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
    assert_eq!(app.store.ticket_count().await, 0);
}

#[tokio::test]
async fn test_issue_rejects_empty_and_non_positive_items() {
    let app = TestApp::new();

    let empty = app.purchase(TransactionStatus::Completed, vec![]).await;
    assert_eq!(app.issuer.issue(&empty).await.unwrap_err().kind, ErrorKind::Validation);

    let zero = app
        .purchase(TransactionStatus::Completed, vec![item(app.rides[0], 0, None)])
        .await;
    assert_eq!(app.issuer.issue(&zero).await.unwrap_err().kind, ErrorKind::Validation);

    assert_eq!(app.store.ticket_count().await, 0);
}

#[tokio::test]
async fn test_unknown_transaction_is_not_found() {
    let app = TestApp::new();
    let err = app
        .issuer
        .issue_for_transaction(ticketgate_core::types::TransactionId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_encoder_failure_commits_nothing_and_is_retryable() {
    let app = TestApp::new();
    let transaction = app
        .purchase(TransactionStatus::Completed, vec![item(app.rides[0], 2, None)])
        .await;

    let broken = app.issuer_with_encoder(Arc::new(FailingEncoder));
    let err = broken.issue(&transaction).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Encoding);
    assert!(err.is_retryable());
    assert_eq!(app.store.ticket_count().await, 0);

    let healthy = app.issuer_with_encoder(Arc::new(InlinePayloadEncoder::new()));
    let ticket = healthy.issue(&transaction).await.unwrap();
    assert_eq!(ticket.transaction_id, transaction.id);
    assert_eq!(app.store.ticket_count().await, 1);
}

#[tokio::test]
async fn test_line_insert_failure_rolls_back_ticket() {
    let app = TestApp::new();
    let transaction = app
        .purchase(
            TransactionStatus::Completed,
            vec![item(app.rides[0], 2, None), item(app.rides[1], 2, None)],
        )
        .await;

    app.store.fail_next_line_insert();
    assert!(app.issuer.issue(&transaction).await.is_err());
    assert_eq!(app.store.ticket_count().await, 0);

    let ticket = app.issuer.issue(&transaction).await.unwrap();
    assert_eq!(app.store.quota_lines(ticket.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_visit_date_policy_spans_visit_days() {
    let app = TestApp::with_config(
        IssuanceConfig {
            validity_policy: ValidityPolicy::VisitDate,
            ..IssuanceConfig::default()
        },
        helpers::fast_redemption(),
    );

    let ticket = app
        .issued_ticket(vec![
            item(app.rides[0], 2, Some(july(5))),
            item(app.rides[1], 2, Some(july(3))),
        ])
        .await;

    assert_eq!(
        ticket.valid_from,
        Utc.with_ymd_and_hms(2025, 7, 3, 0, 0, 0).unwrap()
    );
    assert_eq!(ticket.valid_until.date_naive(), july(5));
    assert_eq!(app.line(&ticket, app.rides[1]).await.visit_date, Some(july(3)));
}

#[tokio::test]
async fn test_visit_date_policy_falls_back_for_open_dated_items() {
    let app = TestApp::with_config(
        IssuanceConfig {
            validity_policy: ValidityPolicy::VisitDate,
            validity_days: 30,
            ..IssuanceConfig::default()
        },
        helpers::fast_redemption(),
    );

    let ticket = app
        .issued_ticket(vec![
            item(app.rides[0], 2, Some(july(5))),
            item(app.rides[1], 2, None),
        ])
        .await;

    assert_eq!(ticket.valid_from, helpers::opening_time());
    assert_eq!(ticket.valid_until, helpers::opening_time() + Duration::days(30));
}

#[tokio::test]
async fn test_out_of_range_validity_fails_without_issuing() {
    let app = TestApp::with_config(
        IssuanceConfig {
            validity_days: 100_000_000,
            ..IssuanceConfig::default()
        },
        helpers::fast_redemption(),
    );
    let transaction = app
        .purchase(TransactionStatus::Completed, vec![item(app.rides[0], 1, None)])
        .await;

    let err = app.issuer.issue(&transaction).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert_eq!(app.store.ticket_count().await, 0);
}

#[tokio::test]
async fn test_backfill_issues_missing_tickets_once() {
    let app = TestApp::new();
    let done = app
        .purchase(TransactionStatus::Completed, vec![item(app.rides[0], 1, None)])
        .await;
    app.purchase(TransactionStatus::Completed, vec![item(app.rides[1], 2, None)])
        .await;
    app.purchase(TransactionStatus::Pending, vec![item(app.rides[1], 2, None)])
        .await;
    app.issuer.issue(&done).await.unwrap();

    let backfill = app.backfill(10);
    let report = backfill.run_once().await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.issued, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(app.store.ticket_count().await, 2);

    let again = backfill.run_once().await.unwrap();
    assert_eq!(again.scanned, 0);
    assert_eq!(app.store.ticket_count().await, 2);
}

#[tokio::test]
async fn test_backfill_skips_failing_transaction_for_newer_ones() {
    let app = TestApp::new();
    let stuck = app.purchase(TransactionStatus::Completed, vec![]).await;
    let paid = app
        .purchase(TransactionStatus::Completed, vec![item(app.rides[0], 2, None)])
        .await;
    let backfill = app.backfill(1);

    let first = backfill.run_once().await.unwrap();
    assert_eq!((first.scanned, first.issued, first.failed), (1, 0, 1));

    let second = backfill.run_once().await.unwrap();
    assert_eq!((second.issued, second.parked), (1, 1));
    let ticket = app.store.find_ticket_by_transaction(paid.id).await.unwrap();
    assert!(ticket.is_some());

    // Retried once its backoff has elapsed, then parked for longer.
    let third = backfill.run_once().await.unwrap();
    assert_eq!((third.scanned, third.failed), (1, 1));
    for _ in 0..2 {
        let skipped = backfill.run_once().await.unwrap();
        assert_eq!((skipped.scanned, skipped.parked), (0, 1));
    }
    assert!(app.store.find_ticket_by_transaction(stuck.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_backfill_picks_up_late_completion() {
    let app = TestApp::new();
    let transaction = app
        .purchase(TransactionStatus::Processing, vec![item(app.rides[0], 1, None)])
        .await;

    let backfill = app.backfill(10);
    assert_eq!(backfill.run_once().await.unwrap().scanned, 0);

    app.purchases
        .set_status(transaction.id, TransactionStatus::Completed)
        .await
        .unwrap();
    let report = backfill.run_once().await.unwrap();
    assert_eq!(report.issued, 1);
}

#[tokio::test]
async fn test_backfill_stops_on_shutdown() {
    let app = TestApp::new();
    let backfill = app.backfill(10);
    let (tx, rx) = tokio::sync::watch::channel(false);

    let handle = tokio::spawn(async move { backfill.run(rx).await });
    let _ = tx.send(true);

    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("backfill did not stop")
        .unwrap();
}
