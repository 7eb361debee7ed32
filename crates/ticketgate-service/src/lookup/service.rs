//! Scan lookup service: preview and validate a ticket without mutating it.

use std::sync::Arc;

use tracing::debug;

use ticketgate_core::error::AppError;
use ticketgate_core::result::AppResult;
use ticketgate_core::traits::Clock;
use ticketgate_core::types::AttractionId;
use ticketgate_database::store::{AttractionDirectory, TicketStore};
use ticketgate_entity::ticket::TicketStatus;

use super::snapshot::{TicketSnapshot, ValidationReport};
use crate::issuance::code::normalize;

/// Read-only ticket projections for the scanner UI.
#[derive(Clone)]
pub struct ScanLookupService {
    /// Ticket persistence.
    store: Arc<dyn TicketStore>,
    /// Attraction names.
    attractions: Arc<dyn AttractionDirectory>,
    /// Time source.
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ScanLookupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanLookupService").finish()
    }
}

impl ScanLookupService {
    /// Creates a new lookup service.
    pub fn new(
        store: Arc<dyn TicketStore>,
        attractions: Arc<dyn AttractionDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            attractions,
            clock,
        }
    }

    /// Returns the current state of a ticket.
    pub async fn lookup(&self, ticket_code: &str) -> AppResult<TicketSnapshot> {
        let code = normalize(ticket_code);
        let ticket = self
            .store
            .find_ticket_by_code(&code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Ticket {code} not found")))?;

        let lines = self.store.quota_lines(ticket.id).await?;
        let ids: Vec<AttractionId> = lines.iter().map(|l| l.attraction_id).collect();
        let names = self.attractions.names(&ids).await?;

        debug!(ticket_code = %code, lines = lines.len(), "Ticket looked up");
        Ok(TicketSnapshot::build(&ticket, &lines, &names))
    }

    /// Checks whether a ticket could be redeemed now, optionally at one attraction.
    pub async fn validate(
        &self,
        ticket_code: &str,
        attraction_id: Option<AttractionId>,
    ) -> AppResult<ValidationReport> {
        let snapshot = self.lookup(ticket_code).await?;
        let now = self.clock.now();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match snapshot.status {
            TicketStatus::Cancelled => errors.push("Ticket has been cancelled".to_string()),
            TicketStatus::Expired => errors.push("Ticket has expired".to_string()),
            TicketStatus::Used => errors.push("All entries have been fully used".to_string()),
            TicketStatus::Active => {}
        }

        if now < snapshot.valid_from {
            errors.push(format!(
                "Ticket is not yet valid (valid from: {})",
                snapshot.valid_from.to_rfc3339()
            ));
        }
        if now > snapshot.valid_until {
            errors.push(format!(
                "Ticket validity has expired (expired on: {})",
                snapshot.valid_until.to_rfc3339()
            ));
        }
        if snapshot.summary.remaining_qty == 0 {
            errors.push("No remaining entries to use".to_string());
        }

        let earliest_visit = snapshot.attractions.iter().filter_map(|a| a.visit_date).min();
        if let Some(visit_date) = earliest_visit {
            if visit_date > now.date_naive() {
                warnings.push(format!("Ticket is for a future date: {visit_date}"));
            }
        }

        let mut attraction = None;
        if let Some(attraction_id) = attraction_id {
            match snapshot.attraction(attraction_id) {
                None => errors.push("This ticket is not valid for the specified attraction".to_string()),
                Some(entry) if entry.remaining_qty == 0 => {
                    errors.push("All entries for this attraction have been used".to_string())
                }
                Some(entry) => attraction = Some(entry.clone()),
            }
        }

        let is_valid = errors.is_empty() && snapshot.status == TicketStatus::Active;
        Ok(ValidationReport {
            is_valid,
            errors,
            warnings,
            attraction,
            snapshot,
        })
    }
}
