//! Read-only access to checkout transactions.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use ticketgate_core::result::AppResult;
use ticketgate_core::types::{AttractionId, TransactionId};
use ticketgate_entity::purchase::{PurchaseLineItem, PurchaseTransaction, TransactionStatus};

use crate::error::map_sqlx_error;
use crate::store::PurchaseSource;

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: TransactionId,
    transaction_code: String,
    status: String,
    customer_name: Option<String>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    attraction_id: AttractionId,
    ticket_type: String,
    quantity: i32,
    visit_date: Option<NaiveDate>,
}

impl From<ItemRow> for PurchaseLineItem {
    fn from(row: ItemRow) -> Self {
        Self {
            attraction_id: row.attraction_id,
            ticket_type: row.ticket_type,
            quantity: row.quantity,
            visit_date: row.visit_date,
        }
    }
}

/// [`PurchaseSource`] over the storefront's checkout tables.
#[derive(Debug, Clone)]
pub struct PgPurchaseSource {
    pool: PgPool,
}

impl PgPurchaseSource {
    /// Create a new purchase source.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseSource for PgPurchaseSource {
    async fn find_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<PurchaseTransaction>> {
        let Some(row) = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, transaction_code, status, customer_name \
             FROM purchase_transactions WHERE id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find transaction", e))?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT attraction_id, ticket_type, quantity, visit_date \
             FROM transaction_items WHERE transaction_id = $1 ORDER BY line_no",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to load transaction items", e))?;

        let status: TransactionStatus = row.status.parse()?;

        Ok(Some(PurchaseTransaction {
            id: row.id,
            transaction_code: row.transaction_code,
            status,
            customer_name: row.customer_name,
            items: items.into_iter().map(PurchaseLineItem::from).collect(),
        }))
    }

    async fn completed_awaiting_tickets(
        &self,
        limit: u32,
        exclude: &[TransactionId],
    ) -> AppResult<Vec<TransactionId>> {
        let exclude: Vec<uuid::Uuid> = exclude.iter().map(|id| id.into_uuid()).collect();
        sqlx::query_scalar::<_, TransactionId>(
            "SELECT t.id FROM purchase_transactions t \
             LEFT JOIN group_tickets g ON g.transaction_id = t.id \
             WHERE upper(t.status) = 'COMPLETED' AND g.id IS NULL \
               AND NOT (t.id = ANY($2)) \
             ORDER BY t.created_at ASC, t.id ASC LIMIT $1",
        )
        .bind(i64::from(limit))
        .bind(exclude)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list transactions awaiting tickets", e))
    }
}
