//! Group ticket entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ticketgate_core::types::{TicketId, TransactionId};

use super::status::TicketStatus;

/// A scannable ticket covering every attraction of one purchase.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupTicket {
    /// Unique ticket identifier.
    pub id: TicketId,
    /// The purchase this ticket was issued for (unique).
    pub transaction_id: TransactionId,
    /// Human-enterable code printed on the ticket and encoded in the scan payload.
    pub ticket_code: String,
    /// Lifecycle status.
    pub status: TicketStatus,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window.
    pub valid_until: DateTime<Utc>,
    /// Aggregate quantity redeemed across all quota lines.
    pub used_count: i32,
    /// Opaque reference returned by the scan payload encoder.
    pub scan_payload_ref: String,
    /// Time of the most recent successful redemption.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the ticket was issued.
    pub created_at: DateTime<Utc>,
    /// When the ticket was last updated.
    pub updated_at: DateTime<Utc>,
}

impl GroupTicket {
    /// Check whether `now` falls after the validity window.
    pub fn is_past_validity(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    /// Check whether `now` falls before the validity window.
    pub fn is_before_validity(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_from
    }
}

/// Data required to create a new group ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroupTicket {
    /// The purchase being materialized.
    pub transaction_id: TransactionId,
    /// Generated ticket code.
    pub ticket_code: String,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window.
    pub valid_until: DateTime<Utc>,
    /// Encoded scan payload reference.
    pub scan_payload_ref: String,
}

impl NewGroupTicket {
    /// Build the persisted row for this ticket.
    pub fn into_ticket(self, now: DateTime<Utc>) -> GroupTicket {
        GroupTicket {
            id: TicketId::new(),
            transaction_id: self.transaction_id,
            ticket_code: self.ticket_code,
            status: TicketStatus::Active,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            used_count: 0,
            scan_payload_ref: self.scan_payload_ref,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
