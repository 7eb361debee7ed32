//! Per-attraction entry quota entities.

pub mod line;

pub use line::{QuotaError, QuotaLine, QuotaSummary};
