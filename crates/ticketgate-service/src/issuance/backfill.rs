//! Periodic issuance for completed purchases that have no ticket yet.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tokio::time;
use tracing::{error, info};

use ticketgate_core::config::WorkerConfig;
use ticketgate_core::result::AppResult;
use ticketgate_core::types::TransactionId;
use ticketgate_database::store::PurchaseSource;

use super::issuer::TicketIssuer;

/// Outcome of one backfill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Transactions found without a ticket.
    pub scanned: u32,
    /// Tickets issued.
    pub issued: u32,
    /// Transactions whose issuance failed.
    pub failed: u32,
    /// Previously failed transactions skipped on this pass.
    pub parked: u32,
}

/// Upper bound on the number of passes a failing transaction sits out.
const MAX_SKIPPED_PASSES: u32 = 32;

/// Backoff state of a transaction whose issuance keeps failing.
#[derive(Debug, Clone, Copy, Default)]
struct Parked {
    failures: u32,
    skip_passes: u32,
}

impl Parked {
    fn record_failure(&mut self) {
        self.failures += 1;
        self.skip_passes = 2u32
            .saturating_pow(self.failures - 1)
            .min(MAX_SKIPPED_PASSES);
    }
}

/// Issues tickets that the payment path failed to deliver.
#[derive(Debug, Clone)]
pub struct IssuanceBackfill {
    issuer: Arc<TicketIssuer>,
    purchases: Arc<dyn PurchaseSource>,
    config: WorkerConfig,
    /// Failing transactions, excluded from the query while they back off so
    /// they cannot fill every batch.
    parked: Arc<Mutex<HashMap<TransactionId, Parked>>>,
}

impl IssuanceBackfill {
    /// Creates a new backfill job.
    pub fn new(
        issuer: Arc<TicketIssuer>,
        purchases: Arc<dyn PurchaseSource>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            issuer,
            purchases,
            config,
            parked: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs a single pass over at most `batch_size` transactions.
    ///
    /// A transaction that fails is skipped for 1, 2, 4, ... passes (capped at
    /// 32) before it is tried again.
    pub async fn run_once(&self) -> AppResult<BackfillReport> {
        let mut parked = self.parked.lock().await;
        let exclude: Vec<TransactionId> = parked
            .iter()
            .filter(|(_, p)| p.skip_passes > 0)
            .map(|(id, _)| *id)
            .collect();
        for entry in parked.values_mut() {
            entry.skip_passes = entry.skip_passes.saturating_sub(1);
        }

        let pending = self
            .purchases
            .completed_awaiting_tickets(self.config.batch_size, &exclude)
            .await?;

        // A short batch saw every transaction still awaiting a ticket, so
        // parked entries missing from it were issued elsewhere.
        if (pending.len() as u32) < self.config.batch_size {
            parked.retain(|id, _| exclude.contains(id) || pending.contains(id));
        }

        let mut report = BackfillReport {
            scanned: pending.len() as u32,
            parked: exclude.len() as u32,
            ..BackfillReport::default()
        };

        for transaction_id in pending {
            match self.issuer.issue_for_transaction(transaction_id).await {
                Ok(ticket) => {
                    parked.remove(&transaction_id);
                    report.issued += 1;
                    info!(
                        transaction_id = %transaction_id,
                        ticket_code = %ticket.ticket_code,
                        "Backfilled ticket"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    let entry = parked.entry(transaction_id).or_default();
                    entry.record_failure();
                    error!(
                        alert = true,
                        transaction_id = %transaction_id,
                        failures = entry.failures,
                        skip_passes = entry.skip_passes,
                        error_kind = %e.kind,
                        error = %e,
                        "Failed to issue ticket for completed transaction"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Runs passes every `poll_interval_seconds` until the cancel signal is received.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);
        info!(
            poll_interval_seconds = self.config.poll_interval_seconds,
            batch_size = self.config.batch_size,
            "Issuance backfill started"
        );

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Issuance backfill received shutdown signal");
                        break;
                    }
                }
                result = self.run_once() => {
                    match result {
                        Ok(report) if report.scanned > 0 || report.parked > 0 => info!(
                            scanned = report.scanned,
                            issued = report.issued,
                            failed = report.failed,
                            parked = report.parked,
                            "Issuance backfill pass completed"
                        ),
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Issuance backfill pass failed"),
                    }

                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                info!("Issuance backfill shutting down");
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        info!("Issuance backfill stopped");
    }
}
