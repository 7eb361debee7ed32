//! Ticket issuer: one group ticket plus one quota line per attraction.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use ticketgate_core::config::issuance::IssuanceConfig;
use ticketgate_core::error::{AppError, ErrorKind};
use ticketgate_core::result::AppResult;
use ticketgate_core::traits::{Clock, ScanPayloadEncoder};
use ticketgate_core::types::{AttractionId, TransactionId};
use ticketgate_database::store::{abandon, PurchaseSource, TicketStore, TicketUnitOfWork};
use ticketgate_entity::purchase::{PurchaseLineItem, PurchaseTransaction};
use ticketgate_entity::quota::QuotaLine;
use ticketgate_entity::ticket::{GroupTicket, NewGroupTicket};

use super::code::TicketCodeGenerator;
use super::validity::ValidityWindow;

/// Entitlement for one attraction after merging line items.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entitlement {
    quantity: i32,
    visit_date: Option<NaiveDate>,
}

/// Materializes group tickets for completed purchases.
///
/// Issuance is idempotent per transaction: duplicate "payment confirmed"
/// deliveries return the ticket that already exists.
#[derive(Clone)]
pub struct TicketIssuer {
    /// Ticket persistence.
    store: Arc<dyn TicketStore>,
    /// Checkout transactions.
    purchases: Arc<dyn PurchaseSource>,
    /// Scan payload encoder.
    encoder: Arc<dyn ScanPayloadEncoder>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Issuance settings.
    config: IssuanceConfig,
    /// Code generator.
    codes: TicketCodeGenerator,
}

impl std::fmt::Debug for TicketIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketIssuer")
            .field("config", &self.config)
            .finish()
    }
}

impl TicketIssuer {
    /// Creates a new ticket issuer.
    pub fn new(
        store: Arc<dyn TicketStore>,
        purchases: Arc<dyn PurchaseSource>,
        encoder: Arc<dyn ScanPayloadEncoder>,
        clock: Arc<dyn Clock>,
        config: IssuanceConfig,
    ) -> Self {
        let codes = TicketCodeGenerator::new(config.code_prefix.clone());
        Self {
            store,
            purchases,
            encoder,
            clock,
            config,
            codes,
        }
    }

    /// Issues the ticket for a transaction known only by ID.
    pub async fn issue_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<GroupTicket> {
        let transaction = self
            .purchases
            .find_transaction(transaction_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Transaction {transaction_id} not found")))?;
        self.issue(&transaction).await
    }

    /// Issues the group ticket for a completed transaction.
    ///
    /// Returns the existing ticket when one was already issued. Nothing is
    /// committed when encoding or any insert fails.
    pub async fn issue(&self, transaction: &PurchaseTransaction) -> AppResult<GroupTicket> {
        if !transaction.is_completed() {
            return Err(AppError::validation(format!(
                "Transaction {} is not completed (status {})",
                transaction.transaction_code, transaction.status
            )));
        }

        if let Some(existing) = self.store.find_ticket_by_transaction(transaction.id).await? {
            info!(
                transaction_id = %transaction.id,
                ticket_code = %existing.ticket_code,
                "Ticket already issued, returning existing"
            );
            return Ok(existing);
        }

        let entitlements = merge_items(&transaction.items)?;
        let now = self.clock.now();
        let window = ValidityWindow::compute(&self.config, &transaction.items, now)?;

        let attempts = self.config.max_code_attempts.max(1);
        for attempt in 1..=attempts {
            let ticket_code = self.codes.generate(now);

            let scan_payload_ref = match self.encoder.encode(&ticket_code).await {
                Ok(reference) => reference,
                Err(e) => {
                    error!(
                        alert = true,
                        transaction_id = %transaction.id,
                        error = %e,
                        "Scan payload encoding failed; ticket not issued"
                    );
                    return Err(if e.kind == ErrorKind::Encoding {
                        e
                    } else {
                        AppError::encoding(format!("Scan payload encoding failed: {}", e.message))
                    });
                }
            };

            let ticket = NewGroupTicket {
                transaction_id: transaction.id,
                ticket_code,
                valid_from: window.valid_from,
                valid_until: window.valid_until,
                scan_payload_ref,
            }
            .into_ticket(now);

            match self.persist(&ticket, &entitlements).await {
                Ok(Persisted::Issued) => {
                    info!(
                        ticket_id = %ticket.id,
                        transaction_id = %transaction.id,
                        ticket_code = %ticket.ticket_code,
                        lines = entitlements.len(),
                        valid_until = %ticket.valid_until,
                        "Ticket issued"
                    );
                    return Ok(ticket);
                }
                Ok(Persisted::AlreadyIssued(existing)) => {
                    info!(
                        transaction_id = %transaction.id,
                        ticket_code = %existing.ticket_code,
                        "Ticket issued concurrently, returning existing"
                    );
                    return Ok(existing);
                }
                Err(e) if e.is_conflict() => {
                    if let Some(existing) =
                        self.store.find_ticket_by_transaction(transaction.id).await?
                    {
                        return Ok(existing);
                    }
                    warn!(
                        transaction_id = %transaction.id,
                        attempt,
                        error = %e,
                        "Ticket code collision, retrying with a fresh code"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::internal(format!(
            "Could not generate a unique ticket code after {attempts} attempts"
        )))
    }

    /// Writes the ticket and its lines in one unit of work.
    async fn persist(
        &self,
        ticket: &GroupTicket,
        entitlements: &BTreeMap<AttractionId, Entitlement>,
    ) -> AppResult<Persisted> {
        let mut uow = self.store.begin().await?;

        if let Some(existing) = uow.find_ticket_by_transaction(ticket.transaction_id).await? {
            uow.rollback().await?;
            return Ok(Persisted::AlreadyIssued(existing));
        }

        if let Err(e) = write_ticket(uow.as_mut(), ticket, entitlements).await {
            abandon(uow).await;
            return Err(e);
        }

        uow.commit().await?;
        Ok(Persisted::Issued)
    }
}

/// Result of one persistence attempt.
enum Persisted {
    Issued,
    AlreadyIssued(GroupTicket),
}

async fn write_ticket(
    uow: &mut dyn TicketUnitOfWork,
    ticket: &GroupTicket,
    entitlements: &BTreeMap<AttractionId, Entitlement>,
) -> AppResult<()> {
    uow.insert_ticket(ticket).await?;
    for (attraction_id, entitlement) in entitlements {
        let line = QuotaLine::issue(
            ticket.id,
            *attraction_id,
            entitlement.quantity,
            entitlement.visit_date,
            ticket.created_at,
        );
        uow.insert_quota_line(&line).await?;
    }
    Ok(())
}

/// Merges line items per attraction: quantities are summed and the earliest
/// visit date is kept.
fn merge_items(items: &[PurchaseLineItem]) -> AppResult<BTreeMap<AttractionId, Entitlement>> {
    if items.is_empty() {
        return Err(AppError::validation("Transaction has no line items"));
    }

    let mut merged: BTreeMap<AttractionId, Entitlement> = BTreeMap::new();
    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::validation(format!(
                "Line item for attraction {} has non-positive quantity {}",
                item.attraction_id, item.quantity
            )));
        }
        let entry = merged.entry(item.attraction_id).or_insert(Entitlement {
            quantity: 0,
            visit_date: item.visit_date,
        });
        entry.quantity = entry.quantity.checked_add(item.quantity).ok_or_else(|| {
            AppError::validation(format!(
                "Quantity overflow for attraction {}",
                item.attraction_id
            ))
        })?;
        entry.visit_date = match (entry.visit_date, item.visit_date) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }
    Ok(merged)
}
