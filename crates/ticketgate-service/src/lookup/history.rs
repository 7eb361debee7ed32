//! Scan history queries.

use std::sync::Arc;

use ticketgate_core::result::AppResult;
use ticketgate_core::types::{PageRequest, PageResponse, UserId};
use ticketgate_database::store::TicketStore;
use ticketgate_entity::redemption::RedemptionAttempt;

use crate::issuance::code::normalize;

/// Lists recorded redemption attempts.
#[derive(Debug, Clone)]
pub struct ScanHistoryService {
    store: Arc<dyn TicketStore>,
}

impl ScanHistoryService {
    /// Creates a new history service.
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Attempts made by one scanner operator, newest first.
    pub async fn for_scanner(
        &self,
        scanner_user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<RedemptionAttempt>> {
        self.store.attempts_by_scanner(scanner_user_id, page).await
    }

    /// Attempts made with a ticket code, newest first.
    pub async fn for_ticket(&self, ticket_code: &str) -> AppResult<Vec<RedemptionAttempt>> {
        self.store.attempts_for_code(&normalize(ticket_code)).await
    }
}
