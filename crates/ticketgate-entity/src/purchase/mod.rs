//! Purchase transaction value objects owned by the checkout subsystem.

pub mod transaction;

pub use transaction::{PurchaseLineItem, PurchaseTransaction, TransactionStatus};
