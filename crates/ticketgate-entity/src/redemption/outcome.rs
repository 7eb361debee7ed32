//! Redemption outcome and rejection reason enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a scan consumed quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "redemption_result", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionResult {
    /// Quota was consumed.
    Redeemed,
    /// The scan was refused; see the reject reason.
    Rejected,
}

impl RedemptionResult {
    /// Return the result as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redeemed => "REDEEMED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for RedemptionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Business reason a scan was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reject_reason", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// No ticket carries the scanned code.
    TicketNotFound,
    /// The ticket has no quota line for the attraction.
    LineNotFound,
    /// The ticket is used, expired or cancelled.
    TicketInvalid,
    /// The validity window has passed.
    TicketExpired,
    /// The validity window has not started.
    TicketNotYetValid,
    /// Fewer entries remain than requested.
    QuotaExhausted,
}

impl RejectReason {
    /// Return the reason as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TicketNotFound => "TICKET_NOT_FOUND",
            Self::LineNotFound => "LINE_NOT_FOUND",
            Self::TicketInvalid => "TICKET_INVALID",
            Self::TicketExpired => "TICKET_EXPIRED",
            Self::TicketNotYetValid => "TICKET_NOT_YET_VALID",
            Self::QuotaExhausted => "QUOTA_EXHAUSTED",
        }
    }

    /// Message shown to the gate operator.
    pub fn message(&self) -> &'static str {
        match self {
            Self::TicketNotFound => "Ticket not found",
            Self::LineNotFound => "Ticket does not include this attraction",
            Self::TicketInvalid => "Ticket is no longer valid",
            Self::TicketExpired => "Ticket has expired",
            Self::TicketNotYetValid => "Ticket is not active yet",
            Self::QuotaExhausted => "Not enough entries remaining for this attraction",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
