//! Ticket store backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use ticketgate_core::result::AppResult;
use ticketgate_core::types::pagination::{PageRequest, PageResponse};
use ticketgate_core::types::{TicketId, TransactionId, UserId};
use ticketgate_entity::quota::QuotaLine;
use ticketgate_entity::redemption::RedemptionAttempt;
use ticketgate_entity::ticket::GroupTicket;

use super::redemption::RedemptionAttemptRepository;
use crate::error::map_sqlx_error;
use crate::store::{TicketStore, TicketUnitOfWork};

/// [`TicketStore`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgTicketStore {
    pool: PgPool,
    attempts: RedemptionAttemptRepository,
}

impl PgTicketStore {
    /// Create a new ticket store.
    pub fn new(pool: PgPool) -> Self {
        let attempts = RedemptionAttemptRepository::new(pool.clone());
        Self { pool, attempts }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn begin(&self) -> AppResult<Box<dyn TicketUnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;
        Ok(Box::new(PgTicketUnitOfWork { tx }))
    }

    async fn find_ticket_by_code(&self, code: &str) -> AppResult<Option<GroupTicket>> {
        sqlx::query_as::<_, GroupTicket>("SELECT * FROM group_tickets WHERE ticket_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to find ticket by code", e))
    }

    async fn find_ticket_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<GroupTicket>> {
        sqlx::query_as::<_, GroupTicket>("SELECT * FROM group_tickets WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to find ticket by transaction", e))
    }

    async fn quota_lines(&self, ticket_id: TicketId) -> AppResult<Vec<QuotaLine>> {
        sqlx::query_as::<_, QuotaLine>(
            "SELECT * FROM quota_lines WHERE ticket_id = $1 ORDER BY attraction_id",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to load quota lines", e))
    }

    async fn attempts_by_scanner(
        &self,
        scanner_user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<RedemptionAttempt>> {
        self.attempts.find_by_scanner(scanner_user_id, page).await
    }

    async fn attempts_for_code(&self, ticket_code: &str) -> AppResult<Vec<RedemptionAttempt>> {
        self.attempts.find_by_code(ticket_code).await
    }
}

/// A `READ COMMITTED` transaction scoped to one ticket.
pub struct PgTicketUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TicketUnitOfWork for PgTicketUnitOfWork {
    async fn find_ticket_by_transaction(
        &mut self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<GroupTicket>> {
        sqlx::query_as::<_, GroupTicket>("SELECT * FROM group_tickets WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to find ticket by transaction", e))
    }

    async fn lock_ticket_by_code(&mut self, code: &str) -> AppResult<Option<GroupTicket>> {
        sqlx::query_as::<_, GroupTicket>(
            "SELECT * FROM group_tickets WHERE ticket_code = $1 FOR UPDATE",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to lock ticket", e))
    }

    async fn quota_lines(&mut self, ticket_id: TicketId) -> AppResult<Vec<QuotaLine>> {
        sqlx::query_as::<_, QuotaLine>(
            "SELECT * FROM quota_lines WHERE ticket_id = $1 ORDER BY attraction_id",
        )
        .bind(ticket_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to load quota lines", e))
    }

    async fn find_attempt_by_key(&mut self, key: &str) -> AppResult<Option<RedemptionAttempt>> {
        RedemptionAttemptRepository::find_by_key(&mut *self.tx, key).await
    }

    async fn insert_ticket(&mut self, ticket: &GroupTicket) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO group_tickets \
             (id, transaction_id, ticket_code, status, valid_from, valid_until, used_count, \
              scan_payload_ref, last_used_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(ticket.id)
        .bind(ticket.transaction_id)
        .bind(&ticket.ticket_code)
        .bind(ticket.status)
        .bind(ticket.valid_from)
        .bind(ticket.valid_until)
        .bind(ticket.used_count)
        .bind(&ticket.scan_payload_ref)
        .bind(ticket.last_used_at)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert ticket", e))?;
        Ok(())
    }

    async fn insert_quota_line(&mut self, line: &QuotaLine) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO quota_lines \
             (ticket_id, attraction_id, total_qty, used_qty, remaining_qty, visit_date, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(line.ticket_id)
        .bind(line.attraction_id)
        .bind(line.total_qty)
        .bind(line.used_qty)
        .bind(line.remaining_qty)
        .bind(line.visit_date)
        .bind(line.created_at)
        .bind(line.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert quota line", e))?;
        Ok(())
    }

    async fn apply_consumption(
        &mut self,
        line: &QuotaLine,
        expected_remaining: i32,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE quota_lines SET used_qty = $3, remaining_qty = $4, updated_at = $5 \
             WHERE ticket_id = $1 AND attraction_id = $2 AND remaining_qty = $6",
        )
        .bind(line.ticket_id)
        .bind(line.attraction_id)
        .bind(line.used_qty)
        .bind(line.remaining_qty)
        .bind(line.updated_at)
        .bind(expected_remaining)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to consume quota", e))?;

        let applied = result.rows_affected() == 1;
        if !applied {
            debug!(
                ticket_id = %line.ticket_id,
                attraction_id = %line.attraction_id,
                expected_remaining,
                "Quota compare-and-swap lost"
            );
        }
        Ok(applied)
    }

    async fn update_ticket_state(&mut self, ticket: &GroupTicket) -> AppResult<()> {
        sqlx::query(
            "UPDATE group_tickets SET status = $2, used_count = $3, last_used_at = $4, \
             updated_at = $5 WHERE id = $1",
        )
        .bind(ticket.id)
        .bind(ticket.status)
        .bind(ticket.used_count)
        .bind(ticket.last_used_at)
        .bind(ticket.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to update ticket", e))?;
        Ok(())
    }

    async fn insert_attempt(&mut self, attempt: &RedemptionAttempt) -> AppResult<()> {
        RedemptionAttemptRepository::insert(&mut *self.tx, attempt).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("Failed to roll back transaction", e))
    }
}
