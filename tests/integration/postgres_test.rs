//! End-to-end tests against PostgreSQL.
//!
//! Run with `TICKETGATE_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

use std::sync::Arc;

use ticketgate_core::config::{DatabaseConfig, IssuanceConfig};
use ticketgate_core::traits::{Clock, SystemClock};
use ticketgate_core::types::{AttractionId, TransactionId};
use ticketgate_database::store::TicketStore;
use ticketgate_database::{DatabasePool, PgPurchaseSource, PgTicketStore};
use ticketgate_entity::redemption::RejectReason;
use ticketgate_service::{InlinePayloadEncoder, RedemptionEngine, TicketIssuer};

use crate::helpers::{self, scan};

async fn connect() -> DatabasePool {
    let url = std::env::var("TICKETGATE_TEST_DATABASE_URL")
        .expect("TICKETGATE_TEST_DATABASE_URL must be set");
    let db = DatabasePool::connect(&DatabaseConfig {
        url,
        max_connections: 8,
        min_connections: 1,
        connect_timeout_seconds: 10,
        idle_timeout_seconds: 60,
    })
    .await
    .expect("Failed to connect to test database");

    ticketgate_database::migration::run_migrations(db.pool())
        .await
        .expect("Failed to run migrations");
    db
}

async fn seed_purchase(db: &DatabasePool, attraction_id: AttractionId, quantity: i32) -> TransactionId {
    let id = TransactionId::new();
    sqlx::query("INSERT INTO attractions (id, name) VALUES ($1, 'Roller Coaster')")
        .bind(attraction_id)
        .execute(db.pool())
        .await
        .expect("Failed to insert attraction");
    sqlx::query(
        "INSERT INTO purchase_transactions (id, transaction_code, status, completed_at) \
         VALUES ($1, $2, 'COMPLETED', NOW())",
    )
    .bind(id)
    .bind(format!("TRX-{id}"))
    .execute(db.pool())
    .await
    .expect("Failed to insert transaction");
    sqlx::query(
        "INSERT INTO transaction_items (transaction_id, line_no, attraction_id, ticket_type, quantity) \
         VALUES ($1, 1, $2, 'adult', $3)",
    )
    .bind(id)
    .bind(attraction_id)
    .bind(quantity)
    .execute(db.pool())
    .await
    .expect("Failed to insert line item");
    id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires PostgreSQL"]
async fn test_postgres_issue_and_parallel_redeem() {
    let db = connect().await;
    let attraction_id = AttractionId::new();
    let transaction_id = seed_purchase(&db, attraction_id, 3).await;

    let store: Arc<dyn TicketStore> = Arc::new(PgTicketStore::new(db.pool().clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let issuer = TicketIssuer::new(
        store.clone(),
        Arc::new(PgPurchaseSource::new(db.pool().clone())),
        Arc::new(InlinePayloadEncoder::new()),
        clock.clone(),
        IssuanceConfig::default(),
    );
    let engine = RedemptionEngine::new(store.clone(), clock, helpers::fast_redemption());

    let ticket = issuer.issue_for_transaction(transaction_id).await.unwrap();
    let again = issuer.issue_for_transaction(transaction_id).await.unwrap();
    assert_eq!(ticket.id, again.id);

    let tasks = (0..10).map(|_| {
        let engine = engine.clone();
        let request = scan(&ticket.ticket_code, attraction_id, 1);
        tokio::spawn(async move { engine.redeem(request).await })
    });
    let outcomes: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_redeemed()).count(), 3);
    assert!(outcomes.iter().all(|o| o.is_redeemed()
        || matches!(
            o.reject_reason,
            Some(RejectReason::QuotaExhausted | RejectReason::TicketInvalid)
        )));

    let lines = store.quota_lines(ticket.id).await.unwrap();
    assert_eq!(lines[0].remaining_qty, 0);
    assert_eq!(store.attempts_for_code(&ticket.ticket_code).await.unwrap().len(), 10);

    db.close().await;
}
