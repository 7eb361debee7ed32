//! Scan payload encoder collaborator.

use async_trait::async_trait;

use crate::result::AppResult;

/// Turns a ticket code into an opaque, storable reference to its scannable
/// rendering (a QR image URL, a data URI, ...).
///
/// Failures must be reported as [`ErrorKind::Encoding`](crate::error::ErrorKind::Encoding)
/// so that issuance can be retried without partially committing a ticket.
#[async_trait]
pub trait ScanPayloadEncoder: Send + Sync + std::fmt::Debug {
    /// Encode `text` and return the reference to store.
    async fn encode(&self, text: &str) -> AppResult<String>;
}
