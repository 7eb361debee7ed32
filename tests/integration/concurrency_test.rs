//! Integration tests for concurrent scans and lost races.

use std::sync::Arc;

use ticketgate_core::error::ErrorKind;
use ticketgate_core::traits::Clock;
use ticketgate_database::store::TicketStore;
use ticketgate_entity::redemption::RejectReason;
use ticketgate_entity::ticket::TicketStatus;
use ticketgate_service::RedemptionEngine;

use crate::helpers::{self, FlakyStore, TestApp, item, scan};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_scans_never_oversell() {
    let app = TestApp::new();
    let [coaster, aquarium] = app.rides;
    let ticket = app
        .issued_ticket(vec![item(coaster, 5, None), item(aquarium, 1, None)])
        .await;

    let tasks = (0..20).map(|_| {
        let engine = app.engine.clone();
        let request = scan(&ticket.ticket_code, coaster, 1);
        tokio::spawn(async move { engine.redeem(request).await })
    });
    let outcomes: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let redeemed = outcomes.iter().filter(|o| o.is_redeemed()).count();
    let exhausted = outcomes
        .iter()
        .filter(|o| o.reject_reason == Some(RejectReason::QuotaExhausted))
        .count();
    assert_eq!(redeemed, 5);
    assert_eq!(exhausted, 15);

    let line = app.line(&ticket, coaster).await;
    assert_eq!((line.used_qty, line.remaining_qty), (5, 0));
    let reloaded = app.reload(&ticket).await;
    assert_eq!(reloaded.status, TicketStatus::Active);
    assert_eq!(reloaded.used_count, 5);
    assert_eq!(app.store.attempts().await.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_scans_on_last_line_mark_ticket_used() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 3, None)]).await;

    let tasks = (0..10).map(|_| {
        let engine = app.engine.clone();
        let request = scan(&ticket.ticket_code, coaster, 1);
        tokio::spawn(async move { engine.redeem(request).await })
    });
    let outcomes: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_redeemed()).count(), 3);
    assert!(outcomes
        .iter()
        .filter(|o| !o.is_redeemed())
        .all(|o| o.reject_reason == Some(RejectReason::TicketInvalid)));
    assert_eq!(app.reload(&ticket).await.status, TicketStatus::Used);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_retries_of_one_scan_redeem_once() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 5, None)]).await;
    let request = scan(&ticket.ticket_code, coaster, 2);

    let tasks = (0..10).map(|_| {
        let engine = app.engine.clone();
        let request = request.clone();
        tokio::spawn(async move { engine.redeem(request).await })
    });
    let outcomes: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(outcomes.iter().all(|o| o.attempt_id == outcomes[0].attempt_id));
    assert!(outcomes.iter().all(|o| o.remaining_qty == Some(3)));
    assert_eq!(outcomes.iter().filter(|o| !o.replayed).count(), 1);
    assert_eq!(app.line(&ticket, coaster).await.remaining_qty, 3);
    assert_eq!(app.store.attempts().await.len(), 1);
}

#[tokio::test]
async fn test_lost_swap_is_retried() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 4, None)]).await;

    let flaky = FlakyStore::new(app.store.clone(), 2);
    let clock: Arc<dyn Clock> = app.clock.clone();
    let engine = RedemptionEngine::new(Arc::new(flaky.clone()), clock, helpers::fast_redemption());

    let outcome = engine.redeem(scan(&ticket.ticket_code, coaster, 1)).await.unwrap();

    assert!(outcome.is_redeemed());
    assert_eq!(outcome.remaining_qty, Some(3));
    assert_eq!(flaky.pending_losses(), 0);
    assert_eq!(app.store.attempts().await.len(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_commit_nothing() {
    let app = TestApp::new();
    let coaster = app.rides[0];
    let ticket = app.issued_ticket(vec![item(coaster, 4, None)]).await;

    let flaky = FlakyStore::new(app.store.clone(), 100);
    let clock: Arc<dyn Clock> = app.clock.clone();
    let engine = RedemptionEngine::new(Arc::new(flaky.clone()), clock, helpers::fast_redemption());

    let err = engine
        .redeem(scan(&ticket.ticket_code, coaster, 1))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Internal);
    // One first try plus three retries.
    assert_eq!(flaky.pending_losses(), 96);
    assert_eq!(app.line(&ticket, coaster).await.remaining_qty, 4);
    assert!(app.store.attempts().await.is_empty());
    assert_eq!(app.reload(&ticket).await.used_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lines_stay_consistent_under_mixed_load() {
    let app = TestApp::new();
    let [coaster, aquarium] = app.rides;
    let ticket = app
        .issued_ticket(vec![item(coaster, 7, None), item(aquarium, 4, None)])
        .await;

    let tasks = (0..24).map(|n| {
        let engine = app.engine.clone();
        let attraction = if n % 2 == 0 { coaster } else { aquarium };
        let request = scan(&ticket.ticket_code, attraction, 1 + (n % 3));
        tokio::spawn(async move { engine.redeem(request).await })
    });
    for joined in futures::future::join_all(tasks).await {
        joined.unwrap().unwrap();
    }

    let lines = app.store.quota_lines(ticket.id).await.unwrap();
    for line in &lines {
        assert!(line.check_invariant().is_ok());
        assert!(line.remaining_qty >= 0);
    }

    let redeemed: i32 = app
        .store
        .attempts()
        .await
        .iter()
        .filter(|a| a.is_redeemed())
        .map(|a| a.requested_qty)
        .sum();
    let used: i32 = lines.iter().map(|l| l.used_qty).sum();
    assert_eq!(redeemed, used);
    assert_eq!(app.reload(&ticket).await.used_count, used);
}
