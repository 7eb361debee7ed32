//! Convenience result type alias for TicketGate.

use crate::error::AppError;

/// A specialized `Result` type for TicketGate operations.
pub type AppResult<T> = Result<T, AppError>;
