//! Redemption audit entities.

pub mod attempt;
pub mod outcome;

pub use attempt::RedemptionAttempt;
pub use outcome::{RedemptionResult, RejectReason};
