//! Persistence traits consumed by the service layer.
//!
//! A [`GroupTicket`] is the aggregate root: its quota lines and redemption
//! attempts are only written through a [`TicketUnitOfWork`], which commits
//! or rolls back as one unit.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;

use ticketgate_core::result::AppResult;
use ticketgate_core::types::{AttractionId, PageRequest, PageResponse, TicketId, TransactionId, UserId};
use ticketgate_entity::purchase::PurchaseTransaction;
use ticketgate_entity::quota::QuotaLine;
use ticketgate_entity::redemption::RedemptionAttempt;
use ticketgate_entity::ticket::GroupTicket;

/// Ticket storage: committed reads plus unit-of-work creation.
#[async_trait]
pub trait TicketStore: Send + Sync + Debug {
    /// Open a unit of work. Dropping it without commit rolls back.
    async fn begin(&self) -> AppResult<Box<dyn TicketUnitOfWork>>;

    /// Find a ticket by its code.
    async fn find_ticket_by_code(&self, code: &str) -> AppResult<Option<GroupTicket>>;

    /// Find the ticket issued for a transaction.
    async fn find_ticket_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<GroupTicket>>;

    /// All quota lines of a ticket, ordered by attraction.
    async fn quota_lines(&self, ticket_id: TicketId) -> AppResult<Vec<QuotaLine>>;

    /// Attempts recorded by one scanner, newest first.
    async fn attempts_by_scanner(
        &self,
        scanner_user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<RedemptionAttempt>>;

    /// Attempts recorded against a ticket code, newest first.
    async fn attempts_for_code(&self, ticket_code: &str) -> AppResult<Vec<RedemptionAttempt>>;
}

/// A ticket-scoped atomic unit of work.
#[async_trait]
pub trait TicketUnitOfWork: Send {
    /// Find the ticket issued for a transaction.
    async fn find_ticket_by_transaction(
        &mut self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<GroupTicket>>;

    /// Find a ticket by code and hold its lock until the unit ends.
    async fn lock_ticket_by_code(&mut self, code: &str) -> AppResult<Option<GroupTicket>>;

    /// Quota lines of a ticket as seen inside this unit.
    async fn quota_lines(&mut self, ticket_id: TicketId) -> AppResult<Vec<QuotaLine>>;

    /// The attempt recorded for an idempotency key, if any.
    async fn find_attempt_by_key(&mut self, key: &str) -> AppResult<Option<RedemptionAttempt>>;

    /// Insert a new ticket. Duplicate code or transaction is a conflict.
    async fn insert_ticket(&mut self, ticket: &GroupTicket) -> AppResult<()>;

    /// Insert a new quota line.
    async fn insert_quota_line(&mut self, line: &QuotaLine) -> AppResult<()>;

    /// Write a consumed line if its remaining quantity is still `expected_remaining`.
    ///
    /// Returns `false` when the compare-and-swap lost.
    async fn apply_consumption(
        &mut self,
        line: &QuotaLine,
        expected_remaining: i32,
    ) -> AppResult<bool>;

    /// Persist status, used count and last use of a ticket.
    async fn update_ticket_state(&mut self, ticket: &GroupTicket) -> AppResult<()>;

    /// Append a redemption attempt. A duplicate key is a conflict.
    async fn insert_attempt(&mut self, attempt: &RedemptionAttempt) -> AppResult<()>;

    /// Make every write of this unit visible.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard every write of this unit.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Read access to checkout transactions.
#[async_trait]
pub trait PurchaseSource: Send + Sync + Debug {
    /// Load a transaction with its line items.
    async fn find_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<PurchaseTransaction>>;

    /// Completed transactions that have no ticket yet, oldest first,
    /// skipping any ID in `exclude`.
    async fn completed_awaiting_tickets(
        &self,
        limit: u32,
        exclude: &[TransactionId],
    ) -> AppResult<Vec<TransactionId>>;
}

/// Read access to attraction display names.
#[async_trait]
pub trait AttractionDirectory: Send + Sync + Debug {
    /// Names for the given attractions; unknown IDs are omitted.
    async fn names(&self, ids: &[AttractionId]) -> AppResult<HashMap<AttractionId, String>>;
}

/// Rolls back a failed unit of work. Rollback errors are logged, not
/// returned, so the original failure reaches the caller.
pub async fn abandon(uow: Box<dyn TicketUnitOfWork>) {
    if let Err(e) = uow.rollback().await {
        tracing::warn!(error = %e, "Rollback failed");
    }
}
