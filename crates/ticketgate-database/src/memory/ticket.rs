//! In-memory ticket store using a Tokio mutex held for each unit of work.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use ticketgate_core::error::AppError;
use ticketgate_core::result::AppResult;
use ticketgate_core::types::pagination::{PageRequest, PageResponse};
use ticketgate_core::types::{AttractionId, TicketId, TransactionId, UserId};
use ticketgate_entity::quota::QuotaLine;
use ticketgate_entity::redemption::RedemptionAttempt;
use ticketgate_entity::ticket::GroupTicket;

use crate::store::{TicketStore, TicketUnitOfWork};

/// Committed contents of the store.
#[derive(Debug, Default)]
struct InnerState {
    tickets: HashMap<TicketId, GroupTicket>,
    by_code: HashMap<String, TicketId>,
    by_transaction: HashMap<TransactionId, TicketId>,
    lines: BTreeMap<(TicketId, AttractionId), QuotaLine>,
    /// Append-only, in insertion order.
    attempts: Vec<RedemptionAttempt>,
    by_key: HashMap<String, usize>,
}

impl InnerState {
    fn ticket_by_code(&self, code: &str) -> Option<GroupTicket> {
        self.by_code
            .get(code)
            .and_then(|id| self.tickets.get(id))
            .cloned()
    }

    fn ticket_by_transaction(&self, transaction_id: TransactionId) -> Option<GroupTicket> {
        self.by_transaction
            .get(&transaction_id)
            .and_then(|id| self.tickets.get(id))
            .cloned()
    }

    fn lines_of(&self, ticket_id: TicketId) -> Vec<QuotaLine> {
        self.lines
            .range((ticket_id, AttractionId::from_uuid(uuid::Uuid::nil()))..)
            .take_while(|((owner, _), _)| *owner == ticket_id)
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Attempts matching `filter`, newest first.
    fn attempts_newest_first(
        &self,
        filter: impl Fn(&RedemptionAttempt) -> bool,
    ) -> Vec<RedemptionAttempt> {
        let mut found: Vec<RedemptionAttempt> = self
            .attempts
            .iter()
            .rev()
            .filter(|a| filter(a))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        found.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        found
    }
}

/// In-memory [`TicketStore`].
///
/// A unit of work holds the store mutex from `begin` until it ends, so units
/// are fully serialized. Writes go straight to the locked state together
/// with an undo log that is replayed on rollback or drop. Suitable for
/// single-node deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryTicketStore {
    state: Arc<Mutex<InnerState>>,
    fail_next_line_insert: Arc<AtomicBool>,
}

impl MemoryTicketStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next quota line insert fail with a database error.
    pub fn fail_next_line_insert(&self) {
        self.fail_next_line_insert.store(true, Ordering::SeqCst);
    }

    /// Number of committed tickets.
    pub async fn ticket_count(&self) -> usize {
        self.state.lock().await.tickets.len()
    }

    /// Every committed attempt in insertion order.
    pub async fn attempts(&self) -> Vec<RedemptionAttempt> {
        self.state.lock().await.attempts.clone()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn begin(&self) -> AppResult<Box<dyn TicketUnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            undo: Vec::new(),
            fail_next_line_insert: self.fail_next_line_insert.clone(),
        }))
    }

    async fn find_ticket_by_code(&self, code: &str) -> AppResult<Option<GroupTicket>> {
        Ok(self.state.lock().await.ticket_by_code(code))
    }

    async fn find_ticket_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<GroupTicket>> {
        Ok(self.state.lock().await.ticket_by_transaction(transaction_id))
    }

    async fn quota_lines(&self, ticket_id: TicketId) -> AppResult<Vec<QuotaLine>> {
        Ok(self.state.lock().await.lines_of(ticket_id))
    }

    async fn attempts_by_scanner(
        &self,
        scanner_user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<RedemptionAttempt>> {
        let matching = self
            .state
            .lock()
            .await
            .attempts_newest_first(|a| a.scanner_user_id == scanner_user_id);

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    async fn attempts_for_code(&self, ticket_code: &str) -> AppResult<Vec<RedemptionAttempt>> {
        Ok(self
            .state
            .lock()
            .await
            .attempts_newest_first(|a| a.ticket_code == ticket_code))
    }
}

/// A write made by an open unit of work, kept so it can be reverted.
enum Undo {
    TicketInserted(GroupTicket),
    TicketUpdated(GroupTicket),
    LineInserted((TicketId, AttractionId)),
    LineReplaced(QuotaLine),
    AttemptAppended(String),
}

/// Unit of work that writes through to the locked state and reverts its own
/// writes unless committed.
struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<InnerState>,
    undo: Vec<Undo>,
    fail_next_line_insert: Arc<AtomicBool>,
}

impl MemoryUnitOfWork {
    fn revert(&mut self) {
        let state = &mut *self.guard;
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::TicketInserted(ticket) => {
                    state.tickets.remove(&ticket.id);
                    state.by_code.remove(&ticket.ticket_code);
                    state.by_transaction.remove(&ticket.transaction_id);
                }
                Undo::TicketUpdated(previous) => {
                    state.tickets.insert(previous.id, previous);
                }
                Undo::LineInserted(key) => {
                    state.lines.remove(&key);
                }
                Undo::LineReplaced(previous) => {
                    state
                        .lines
                        .insert((previous.ticket_id, previous.attraction_id), previous);
                }
                Undo::AttemptAppended(key) => {
                    state.attempts.pop();
                    state.by_key.remove(&key);
                }
            }
        }
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.undo.is_empty() {
            debug!(writes = self.undo.len(), "Reverting uncommitted unit of work");
            self.revert();
        }
    }
}

#[async_trait]
impl TicketUnitOfWork for MemoryUnitOfWork {
    async fn find_ticket_by_transaction(
        &mut self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<GroupTicket>> {
        Ok(self.guard.ticket_by_transaction(transaction_id))
    }

    async fn lock_ticket_by_code(&mut self, code: &str) -> AppResult<Option<GroupTicket>> {
        Ok(self.guard.ticket_by_code(code))
    }

    async fn quota_lines(&mut self, ticket_id: TicketId) -> AppResult<Vec<QuotaLine>> {
        Ok(self.guard.lines_of(ticket_id))
    }

    async fn find_attempt_by_key(&mut self, key: &str) -> AppResult<Option<RedemptionAttempt>> {
        Ok(self
            .guard
            .by_key
            .get(key)
            .and_then(|idx| self.guard.attempts.get(*idx))
            .cloned())
    }

    async fn insert_ticket(&mut self, ticket: &GroupTicket) -> AppResult<()> {
        let state = &mut *self.guard;
        if state.by_code.contains_key(&ticket.ticket_code) {
            return Err(AppError::conflict(format!(
                "Ticket code {} already exists",
                ticket.ticket_code
            )));
        }
        if state.by_transaction.contains_key(&ticket.transaction_id) {
            return Err(AppError::conflict(format!(
                "Transaction {} already has a ticket",
                ticket.transaction_id
            )));
        }
        if ticket.valid_from > ticket.valid_until {
            return Err(AppError::internal("Ticket validity window is inverted"));
        }

        state.by_code.insert(ticket.ticket_code.clone(), ticket.id);
        state.by_transaction.insert(ticket.transaction_id, ticket.id);
        state.tickets.insert(ticket.id, ticket.clone());
        self.undo.push(Undo::TicketInserted(ticket.clone()));
        Ok(())
    }

    async fn insert_quota_line(&mut self, line: &QuotaLine) -> AppResult<()> {
        if self.fail_next_line_insert.swap(false, Ordering::SeqCst) {
            return Err(AppError::database("Injected quota line insert failure"));
        }
        let state = &mut *self.guard;
        if !state.tickets.contains_key(&line.ticket_id) {
            return Err(AppError::internal(format!(
                "Quota line references unknown ticket {}",
                line.ticket_id
            )));
        }
        if line.total_qty <= 0 {
            return Err(AppError::internal("Quota line total must be positive"));
        }
        line.check_invariant()
            .map_err(|e| AppError::internal(e.to_string()))?;

        let key = (line.ticket_id, line.attraction_id);
        if state.lines.contains_key(&key) {
            return Err(AppError::conflict(format!(
                "Quota line for attraction {} already exists",
                line.attraction_id
            )));
        }
        state.lines.insert(key, line.clone());
        self.undo.push(Undo::LineInserted(key));
        Ok(())
    }

    async fn apply_consumption(
        &mut self,
        line: &QuotaLine,
        expected_remaining: i32,
    ) -> AppResult<bool> {
        let key = (line.ticket_id, line.attraction_id);
        let Some(current) = self.guard.lines.get_mut(&key) else {
            return Ok(false);
        };
        if current.remaining_qty != expected_remaining {
            debug!(
                ticket_id = %line.ticket_id,
                attraction_id = %line.attraction_id,
                expected_remaining,
                actual_remaining = current.remaining_qty,
                "Quota compare-and-swap lost"
            );
            return Ok(false);
        }
        if line.total_qty != current.total_qty {
            return Err(AppError::internal("total_qty is immutable"));
        }
        if line.remaining_qty > current.remaining_qty {
            return Err(AppError::internal("remaining_qty may not increase"));
        }
        line.check_invariant()
            .map_err(|e| AppError::internal(e.to_string()))?;

        let previous = std::mem::replace(current, line.clone());
        self.undo.push(Undo::LineReplaced(previous));
        Ok(true)
    }

    async fn update_ticket_state(&mut self, ticket: &GroupTicket) -> AppResult<()> {
        let Some(current) = self.guard.tickets.get_mut(&ticket.id) else {
            return Err(AppError::not_found(format!("Ticket {} not found", ticket.id)));
        };
        let previous = current.clone();
        current.status = ticket.status;
        current.used_count = ticket.used_count;
        current.last_used_at = ticket.last_used_at;
        current.updated_at = ticket.updated_at;
        self.undo.push(Undo::TicketUpdated(previous));
        Ok(())
    }

    async fn insert_attempt(&mut self, attempt: &RedemptionAttempt) -> AppResult<()> {
        let state = &mut *self.guard;
        if state.by_key.contains_key(&attempt.idempotency_key) {
            return Err(AppError::conflict(format!(
                "Idempotency key {} already recorded",
                attempt.idempotency_key
            )));
        }
        if let Some(ticket_id) = attempt.ticket_id {
            if !state.tickets.contains_key(&ticket_id) {
                return Err(AppError::internal(format!(
                    "Attempt references unknown ticket {ticket_id}"
                )));
            }
        }

        state
            .by_key
            .insert(attempt.idempotency_key.clone(), state.attempts.len());
        state.attempts.push(attempt.clone());
        self.undo
            .push(Undo::AttemptAppended(attempt.idempotency_key.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut unit = self;
        unit.undo.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        // Dropping the unit reverts its writes.
        Ok(())
    }
}
