//! Ticket lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::quota::QuotaLine;

/// Lifecycle status of a group ticket.
///
/// `ACTIVE` is the only state that accepts redemptions. `USED` is derived
/// from the quota lines and never assigned directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Issued and redeemable within its validity window.
    Active,
    /// Every quota line is exhausted.
    Used,
    /// The validity window has passed.
    Expired,
    /// Refunded or voided.
    Cancelled,
}

impl TicketStatus {
    /// Check if a scan may consume quota in this state.
    pub fn accepts_redemption(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check if the ticket is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.accepts_redemption()
    }

    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Used => "USED",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive the status a ticket should hold given its quota lines.
///
/// Terminal states are sticky. An active ticket becomes `USED` once it has
/// at least one line and every line is exhausted.
pub fn derive_status(current: TicketStatus, lines: &[QuotaLine]) -> TicketStatus {
    if current.is_terminal() {
        return current;
    }
    if !lines.is_empty() && lines.iter().all(QuotaLine::is_exhausted) {
        TicketStatus::Used
    } else {
        current
    }
}
