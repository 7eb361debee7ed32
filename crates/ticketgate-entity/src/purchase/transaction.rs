//! Purchase transaction as exposed by the checkout subsystem.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ticketgate_core::error::AppError;
use ticketgate_core::types::{AttractionId, TransactionId};

/// Checkout status of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Awaiting payment.
    Pending,
    /// Payment in flight at the gateway.
    Processing,
    /// Paid; eligible for ticket issuance.
    Completed,
    /// Payment failed.
    Failed,
    /// Abandoned by the customer.
    Cancelled,
    /// Money returned.
    Refunded,
    /// Payment window elapsed.
    Expired,
}

impl TransactionStatus {
    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            "REFUNDED" => Ok(Self::Refunded),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(AppError::validation(format!(
                "Unknown transaction status: {other}"
            ))),
        }
    }
}

/// One purchased product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLineItem {
    /// Attraction admitted by this line.
    pub attraction_id: AttractionId,
    /// Product variant (adult, child, ...).
    pub ticket_type: String,
    /// Number of entries purchased.
    pub quantity: i32,
    /// Planned visit date for dated products.
    pub visit_date: Option<NaiveDate>,
}

/// A purchase, referenced by ID only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseTransaction {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Human-facing order code.
    pub transaction_code: String,
    /// Checkout status.
    pub status: TransactionStatus,
    /// Customer display name.
    pub customer_name: Option<String>,
    /// Ordered line items.
    pub items: Vec<PurchaseLineItem>,
}

impl PurchaseTransaction {
    /// Check if the purchase has been paid.
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}
