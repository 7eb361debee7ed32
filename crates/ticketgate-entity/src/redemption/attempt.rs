//! Redemption attempt entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ticketgate_core::types::{AttractionId, RedemptionId, TicketId, UserId};

use super::outcome::{RedemptionResult, RejectReason};
use crate::ticket::TicketStatus;

/// An append-only record of one scan at a gate.
///
/// The row for an idempotency key is the proof that the request was
/// evaluated; replays return the stored values verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RedemptionAttempt {
    /// Unique attempt identifier.
    pub id: RedemptionId,
    /// Resolved ticket, absent when the code matched nothing.
    pub ticket_id: Option<TicketId>,
    /// Code as presented by the scanner.
    pub ticket_code: String,
    /// Attraction the scan was made at.
    pub attraction_id: AttractionId,
    /// Quantity the scanner asked for.
    pub requested_qty: i32,
    /// Whether quota was consumed.
    pub outcome: RedemptionResult,
    /// Reason for a rejection.
    pub reject_reason: Option<RejectReason>,
    /// Caller-supplied key (globally unique).
    pub idempotency_key: String,
    /// Operator who scanned.
    pub scanner_user_id: UserId,
    /// Remaining quantity reported to the scanner.
    pub remaining_qty: Option<i32>,
    /// Ticket status reported to the scanner.
    pub ticket_status: Option<TicketStatus>,
    /// When the attempt was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl RedemptionAttempt {
    /// Check if the attempt consumed quota.
    pub fn is_redeemed(&self) -> bool {
        self.outcome == RedemptionResult::Redeemed
    }

    /// Check if a replayed request carries the same arguments as the original.
    pub fn matches_request(
        &self,
        ticket_code: &str,
        attraction_id: AttractionId,
        requested_qty: i32,
    ) -> bool {
        self.ticket_code == ticket_code
            && self.attraction_id == attraction_id
            && self.requested_qty == requested_qty
    }
}
