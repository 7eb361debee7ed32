//! Redemption attempt repository implementation.

use sqlx::{PgConnection, PgPool};

use ticketgate_core::result::AppResult;
use ticketgate_core::types::pagination::{PageRequest, PageResponse};
use ticketgate_core::types::UserId;
use ticketgate_entity::redemption::RedemptionAttempt;

use crate::error::map_sqlx_error;

const INSERT_ATTEMPT: &str = "INSERT INTO redemption_attempts \
    (id, ticket_id, ticket_code, attraction_id, requested_qty, outcome, reject_reason, \
     idempotency_key, scanner_user_id, remaining_qty, ticket_status, recorded_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";

/// Repository for the append-only redemption audit log.
#[derive(Debug, Clone)]
pub struct RedemptionAttemptRepository {
    pool: PgPool,
}

impl RedemptionAttemptRepository {
    /// Create a new redemption attempt repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List attempts recorded by a scanner, newest first.
    pub async fn find_by_scanner(
        &self,
        scanner_user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<RedemptionAttempt>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM redemption_attempts WHERE scanner_user_id = $1",
        )
        .bind(scanner_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to count redemption attempts", e))?;

        let attempts = sqlx::query_as::<_, RedemptionAttempt>(
            "SELECT * FROM redemption_attempts WHERE scanner_user_id = $1 \
             ORDER BY recorded_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(scanner_user_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list redemption attempts", e))?;

        Ok(PageResponse::new(
            attempts,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    /// List attempts made with a ticket code, newest first.
    pub async fn find_by_code(&self, ticket_code: &str) -> AppResult<Vec<RedemptionAttempt>> {
        sqlx::query_as::<_, RedemptionAttempt>(
            "SELECT * FROM redemption_attempts WHERE ticket_code = $1 \
             ORDER BY recorded_at DESC, id DESC",
        )
        .bind(ticket_code)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list ticket redemption attempts", e))
    }

    /// Find the attempt recorded for an idempotency key on an open connection.
    pub(crate) async fn find_by_key(
        conn: &mut PgConnection,
        key: &str,
    ) -> AppResult<Option<RedemptionAttempt>> {
        sqlx::query_as::<_, RedemptionAttempt>(
            "SELECT * FROM redemption_attempts WHERE idempotency_key = $1",
        )
        .bind(key)
        .fetch_optional(conn)
        .await
        .map_err(|e| map_sqlx_error("Failed to find redemption attempt", e))
    }

    /// Append an attempt on an open connection.
    pub(crate) async fn insert(
        conn: &mut PgConnection,
        attempt: &RedemptionAttempt,
    ) -> AppResult<()> {
        sqlx::query(INSERT_ATTEMPT)
            .bind(attempt.id)
            .bind(attempt.ticket_id)
            .bind(&attempt.ticket_code)
            .bind(attempt.attraction_id)
            .bind(attempt.requested_qty)
            .bind(attempt.outcome)
            .bind(attempt.reject_reason)
            .bind(&attempt.idempotency_key)
            .bind(attempt.scanner_user_id)
            .bind(attempt.remaining_qty)
            .bind(attempt.ticket_status)
            .bind(attempt.recorded_at)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("Failed to record redemption attempt", e))?;
        Ok(())
    }
}
