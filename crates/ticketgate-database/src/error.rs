//! Mapping of sqlx errors onto [`AppError`].

use ticketgate_core::error::{AppError, ErrorKind};

/// `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";
/// `check_violation`, also raised by the quota monotonicity trigger.
const CHECK_VIOLATION: &str = "23514";
/// `serialization_failure`
const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`
const DEADLOCK_DETECTED: &str = "40P01";

/// Convert a sqlx error into an application error, classifying lost races
/// as [`ErrorKind::Conflict`] so that callers can retry.
pub fn map_sqlx_error(context: &str, err: sqlx::Error) -> AppError {
    let kind = classify(&err);
    AppError::with_source(kind, format!("{context}: {err}"), err)
}

fn classify(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(UNIQUE_VIOLATION | SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                ErrorKind::Conflict
            }
            Some(CHECK_VIOLATION) => ErrorKind::Internal,
            _ => ErrorKind::Database,
        },
        _ => ErrorKind::Database,
    }
}
