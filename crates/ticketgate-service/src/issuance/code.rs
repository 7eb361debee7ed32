//! Ticket code generation and normalization.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Unambiguous 32-symbol alphabet (no `I`, `L`, `O`, `U`).
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of the random suffix.
const SUFFIX_LEN: usize = 8;

/// Generates human-enterable ticket codes of the form `PREFIX-YYYYMMDD-XXXXXXXX`.
#[derive(Debug, Clone)]
pub struct TicketCodeGenerator {
    prefix: String,
}

impl TicketCodeGenerator {
    /// Creates a generator with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: normalize(&prefix.into()),
        }
    }

    /// Generates a fresh code dated `now`.
    pub fn generate(&self, now: DateTime<Utc>) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        format!("{}-{}-{}", self.prefix, now.format("%Y%m%d"), suffix)
    }
}

impl Default for TicketCodeGenerator {
    fn default() -> Self {
        Self::new("TKT")
    }
}

/// Normalizes a code typed or scanned at the gate.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
