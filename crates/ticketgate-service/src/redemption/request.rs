//! Redemption request and outcome types.

use serde::{Deserialize, Serialize};
use validator::Validate;

use ticketgate_core::types::{AttractionId, RedemptionId, UserId};
use ticketgate_entity::redemption::{RedemptionAttempt, RedemptionResult, RejectReason};
use ticketgate_entity::ticket::TicketStatus;

/// A scan submitted by a gate scanner.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RedeemRequest {
    /// Code read from the ticket.
    #[validate(length(min = 1, max = 64))]
    pub ticket_code: String,
    /// Attraction the gate belongs to.
    pub attraction_id: AttractionId,
    /// Number of entries to admit. Any positive quantity is accepted here;
    /// the quota line decides whether it can be admitted.
    #[validate(range(min = 1))]
    pub requested_qty: i32,
    /// Caller-chosen key; resubmitting it replays the original outcome.
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: String,
    /// Operator performing the scan.
    pub scanner_user_id: UserId,
}

/// What the scanner is told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionOutcome {
    /// Whether entries were admitted.
    pub outcome: RedemptionResult,
    /// Why the scan was refused.
    pub reject_reason: Option<RejectReason>,
    /// Entries left on the attraction line.
    pub remaining_qty: Option<i32>,
    /// Ticket status after the scan.
    pub ticket_status: Option<TicketStatus>,
    /// Recorded attempt.
    pub attempt_id: RedemptionId,
    /// Whether this response was replayed from an earlier identical request.
    #[serde(skip)]
    pub replayed: bool,
}

impl RedemptionOutcome {
    /// Builds the response stored on an attempt.
    pub fn from_attempt(attempt: &RedemptionAttempt, replayed: bool) -> Self {
        Self {
            outcome: attempt.outcome,
            reject_reason: attempt.reject_reason,
            remaining_qty: attempt.remaining_qty,
            ticket_status: attempt.ticket_status,
            attempt_id: attempt.id,
            replayed,
        }
    }

    /// Check if entries were admitted.
    pub fn is_redeemed(&self) -> bool {
        self.outcome == RedemptionResult::Redeemed
    }

    /// Human-readable reason for a rejection.
    pub fn message(&self) -> Option<&'static str> {
        self.reject_reason.map(|r| r.message())
    }
}
