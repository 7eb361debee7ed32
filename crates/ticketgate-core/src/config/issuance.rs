//! Ticket issuance configuration.

use serde::{Deserialize, Serialize};

/// How the validity window of a new group ticket is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityPolicy {
    /// Valid from the moment of issuance for `validity_days`.
    FixedWindow,
    /// Valid from the start of the earliest visit date to the end of the
    /// latest one. Falls back to the fixed window when any line item is
    /// open-dated.
    VisitDate,
}

/// Issuance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceConfig {
    /// Validity window policy.
    #[serde(default = "default_policy")]
    pub validity_policy: ValidityPolicy,
    /// Length of the fixed validity window in days.
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    /// Prefix of generated ticket codes.
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,
    /// How many fresh codes to try when a generated code collides.
    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: u32,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            validity_policy: default_policy(),
            validity_days: default_validity_days(),
            code_prefix: default_code_prefix(),
            max_code_attempts: default_max_code_attempts(),
        }
    }
}

fn default_policy() -> ValidityPolicy {
    ValidityPolicy::FixedWindow
}

fn default_validity_days() -> u32 {
    365
}

fn default_code_prefix() -> String {
    "TKT".to_string()
}

fn default_max_code_attempts() -> u32 {
    3
}
