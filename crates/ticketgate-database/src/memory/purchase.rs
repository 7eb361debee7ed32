//! In-memory checkout transactions.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use ticketgate_core::error::AppError;
use ticketgate_core::result::AppResult;
use ticketgate_core::types::TransactionId;
use ticketgate_entity::purchase::{PurchaseTransaction, TransactionStatus};

use super::ticket::MemoryTicketStore;
use crate::store::{PurchaseSource, TicketStore};

/// In-memory [`PurchaseSource`].
///
/// Ticket existence is read from the paired [`MemoryTicketStore`].
#[derive(Debug, Clone)]
pub struct MemoryPurchaseSource {
    /// Transactions in arrival order.
    transactions: Arc<RwLock<Vec<PurchaseTransaction>>>,
    tickets: MemoryTicketStore,
}

impl MemoryPurchaseSource {
    /// Create an empty source paired with a ticket store.
    pub fn new(tickets: MemoryTicketStore) -> Self {
        Self {
            transactions: Arc::new(RwLock::new(Vec::new())),
            tickets,
        }
    }

    /// Add or replace a transaction.
    pub async fn upsert(&self, transaction: PurchaseTransaction) {
        let mut transactions = self.transactions.write().await;
        match transactions.iter_mut().find(|t| t.id == transaction.id) {
            Some(existing) => *existing = transaction,
            None => transactions.push(transaction),
        }
    }

    /// Change the checkout status of a transaction.
    pub async fn set_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> AppResult<()> {
        let mut transactions = self.transactions.write().await;
        let transaction = transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| AppError::not_found(format!("Transaction {transaction_id} not found")))?;
        transaction.status = status;
        Ok(())
    }
}

#[async_trait]
impl PurchaseSource for MemoryPurchaseSource {
    async fn find_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> AppResult<Option<PurchaseTransaction>> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .find(|t| t.id == transaction_id)
            .cloned())
    }

    async fn completed_awaiting_tickets(
        &self,
        limit: u32,
        exclude: &[TransactionId],
    ) -> AppResult<Vec<TransactionId>> {
        let completed: Vec<TransactionId> = self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.is_completed() && !exclude.contains(&t.id))
            .map(|t| t.id)
            .collect();

        let mut awaiting = Vec::new();
        for id in completed {
            if awaiting.len() >= limit as usize {
                break;
            }
            if self.tickets.find_ticket_by_transaction(id).await?.is_none() {
                awaiting.push(id);
            }
        }
        Ok(awaiting)
    }
}
