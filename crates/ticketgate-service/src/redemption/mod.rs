//! Gate redemption: validating scans and consuming quota atomically.

pub mod engine;
pub mod request;
pub mod retry;

pub use engine::RedemptionEngine;
pub use request::{RedeemRequest, RedemptionOutcome};
pub use retry::RetryPolicy;
