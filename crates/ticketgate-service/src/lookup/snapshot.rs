//! Ticket snapshot and validation report types.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use ticketgate_core::types::{AttractionId, TicketId, TransactionId};
use ticketgate_entity::quota::{QuotaLine, QuotaSummary};
use ticketgate_entity::ticket::{GroupTicket, TicketStatus};

/// One attraction on a ticket as shown to the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttractionEntitlement {
    /// Attraction identifier.
    pub attraction_id: AttractionId,
    /// Display name, or the identifier when the catalog has no entry.
    pub name: String,
    /// Entries purchased.
    pub total_qty: i32,
    /// Entries consumed.
    pub used_qty: i32,
    /// Entries left.
    pub remaining_qty: i32,
    /// Planned visit date.
    pub visit_date: Option<NaiveDate>,
    /// `remaining_qty > 0` and the ticket is neither expired nor cancelled.
    pub can_redeem: bool,
}

/// Point-in-time view of a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    /// Ticket identifier.
    pub ticket_id: TicketId,
    /// Purchase the ticket belongs to.
    pub transaction_id: TransactionId,
    /// Ticket code.
    pub ticket_code: String,
    /// Lifecycle status.
    pub status: TicketStatus,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window.
    pub valid_until: DateTime<Utc>,
    /// Aggregate redeemed quantity.
    pub used_count: i32,
    /// Most recent successful redemption.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Per-attraction entitlements.
    pub attractions: Vec<AttractionEntitlement>,
    /// Totals across all attractions.
    pub summary: QuotaSummary,
}

impl TicketSnapshot {
    /// Assembles a snapshot from a ticket and its lines.
    pub fn build(
        ticket: &GroupTicket,
        lines: &[QuotaLine],
        names: &HashMap<AttractionId, String>,
    ) -> Self {
        let redeemable_status = !matches!(
            ticket.status,
            TicketStatus::Expired | TicketStatus::Cancelled
        );

        let attractions = lines
            .iter()
            .map(|line| AttractionEntitlement {
                attraction_id: line.attraction_id,
                name: names
                    .get(&line.attraction_id)
                    .cloned()
                    .unwrap_or_else(|| line.attraction_id.to_string()),
                total_qty: line.total_qty,
                used_qty: line.used_qty,
                remaining_qty: line.remaining_qty,
                visit_date: line.visit_date,
                can_redeem: line.remaining_qty > 0 && redeemable_status,
            })
            .collect();

        Self {
            ticket_id: ticket.id,
            transaction_id: ticket.transaction_id,
            ticket_code: ticket.ticket_code.clone(),
            status: ticket.status,
            valid_from: ticket.valid_from,
            valid_until: ticket.valid_until,
            used_count: ticket.used_count,
            last_used_at: ticket.last_used_at,
            attractions,
            summary: QuotaSummary::from_lines(lines),
        }
    }

    /// The entitlement for an attraction, if the ticket has one.
    pub fn attraction(&self, attraction_id: AttractionId) -> Option<&AttractionEntitlement> {
        self.attractions
            .iter()
            .find(|a| a.attraction_id == attraction_id)
    }
}

/// Result of a read-only validity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// `errors` is empty and the ticket is active.
    pub is_valid: bool,
    /// Problems that would make a redemption fail.
    pub errors: Vec<String>,
    /// Advisory notes for the operator.
    pub warnings: Vec<String>,
    /// Entitlement for the requested attraction, when one was given and found.
    pub attraction: Option<AttractionEntitlement>,
    /// The ticket as evaluated.
    pub snapshot: TicketSnapshot,
}
