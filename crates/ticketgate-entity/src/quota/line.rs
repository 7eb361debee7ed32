//! Quota line entity and its invariant primitives.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ticketgate_core::types::{AttractionId, TicketId};

/// A violated quota rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    /// The requested quantity was zero or negative.
    #[error("requested quantity must be positive, got {0}")]
    NonPositiveQuantity(i32),
    /// Not enough entries remain on the line.
    #[error("requested {requested} but only {remaining} remaining")]
    Insufficient {
        /// Quantity asked for.
        requested: i32,
        /// Quantity left on the line.
        remaining: i32,
    },
    /// The counters no longer add up.
    #[error("quota invariant violated: used {used} + remaining {remaining} != total {total}")]
    InvariantViolated {
        /// Total quantity.
        total: i32,
        /// Used quantity.
        used: i32,
        /// Remaining quantity.
        remaining: i32,
    },
}

/// How many entries of one attraction a ticket owns and has consumed.
///
/// `used_qty + remaining_qty == total_qty` holds at all times; `total_qty`
/// never changes after issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct QuotaLine {
    /// Owning ticket.
    pub ticket_id: TicketId,
    /// Attraction the entries are valid for.
    pub attraction_id: AttractionId,
    /// Quantity purchased.
    pub total_qty: i32,
    /// Quantity consumed so far.
    pub used_qty: i32,
    /// Quantity still available.
    pub remaining_qty: i32,
    /// Planned visit date, if the product was dated.
    pub visit_date: Option<NaiveDate>,
    /// When the line was created.
    pub created_at: DateTime<Utc>,
    /// When the line was last consumed.
    pub updated_at: DateTime<Utc>,
}

impl QuotaLine {
    /// Create a fresh, unconsumed line.
    pub fn issue(
        ticket_id: TicketId,
        attraction_id: AttractionId,
        total_qty: i32,
        visit_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            attraction_id,
            total_qty,
            used_qty: 0,
            remaining_qty: total_qty,
            visit_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Consume `qty` entries, keeping the invariant.
    pub fn consume(&mut self, qty: i32, now: DateTime<Utc>) -> Result<(), QuotaError> {
        if qty <= 0 {
            return Err(QuotaError::NonPositiveQuantity(qty));
        }
        if qty > self.remaining_qty {
            return Err(QuotaError::Insufficient {
                requested: qty,
                remaining: self.remaining_qty,
            });
        }
        self.used_qty += qty;
        self.remaining_qty -= qty;
        self.updated_at = now;
        self.check_invariant()
    }

    /// Check if nothing remains on this line.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_qty == 0
    }

    /// Verify the counter invariant.
    pub fn check_invariant(&self) -> Result<(), QuotaError> {
        if self.used_qty < 0
            || self.remaining_qty < 0
            || self.used_qty + self.remaining_qty != self.total_qty
        {
            return Err(QuotaError::InvariantViolated {
                total: self.total_qty,
                used: self.used_qty,
                remaining: self.remaining_qty,
            });
        }
        Ok(())
    }
}

/// Aggregate usage across all lines of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaSummary {
    /// Sum of purchased quantities.
    pub total_qty: i32,
    /// Sum of consumed quantities.
    pub used_qty: i32,
    /// Sum of remaining quantities.
    pub remaining_qty: i32,
    /// Consumed share (0.0 - 100.0).
    pub usage_percentage: f64,
}

impl QuotaSummary {
    /// Summarize a set of lines.
    pub fn from_lines(lines: &[QuotaLine]) -> Self {
        let total_qty: i32 = lines.iter().map(|l| l.total_qty).sum();
        let used_qty: i32 = lines.iter().map(|l| l.used_qty).sum();
        let remaining_qty: i32 = lines.iter().map(|l| l.remaining_qty).sum();
        let usage_percentage = if total_qty == 0 {
            0.0
        } else {
            (used_qty as f64 / total_qty as f64) * 100.0
        };

        Self {
            total_qty,
            used_qty,
            remaining_qty,
            usage_percentage,
        }
    }
}
