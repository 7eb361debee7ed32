//! Default scan payload encoder.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use ticketgate_core::result::AppResult;
use ticketgate_core::traits::ScanPayloadEncoder;

/// Encodes the ticket code as an inline `data:` URI.
///
/// Scanner apps render the QR image client-side from the embedded text, so
/// no image storage is involved.
#[derive(Debug, Clone, Default)]
pub struct InlinePayloadEncoder;

impl InlinePayloadEncoder {
    /// Creates a new inline encoder.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScanPayloadEncoder for InlinePayloadEncoder {
    async fn encode(&self, text: &str) -> AppResult<String> {
        Ok(format!("data:text/plain;base64,{}", BASE64.encode(text)))
    }
}
