//! Validity window policies.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use ticketgate_core::config::issuance::{IssuanceConfig, ValidityPolicy};
use ticketgate_core::error::AppError;
use ticketgate_core::result::AppResult;
use ticketgate_entity::purchase::PurchaseLineItem;

/// The period during which a ticket may be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First redeemable instant.
    pub valid_from: DateTime<Utc>,
    /// Last redeemable instant.
    pub valid_until: DateTime<Utc>,
}

impl ValidityWindow {
    /// Computes the window for a purchase under the configured policy.
    ///
    /// The visit-date policy spans the start of the earliest visit date to the
    /// end of the latest one (UTC) and falls back to the fixed window when any
    /// item is undated.
    pub fn compute(
        config: &IssuanceConfig,
        items: &[PurchaseLineItem],
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        match config.validity_policy {
            ValidityPolicy::FixedWindow => Self::fixed(config, now),
            ValidityPolicy::VisitDate => {
                let dates: Option<Vec<NaiveDate>> =
                    items.iter().map(|item| item.visit_date).collect();
                match dates.as_deref() {
                    Some([first, rest @ ..]) => {
                        let earliest = rest.iter().fold(*first, |acc, d| acc.min(*d));
                        let latest = rest.iter().fold(*first, |acc, d| acc.max(*d));
                        Ok(Self {
                            valid_from: start_of_day(earliest)?,
                            valid_until: end_of_day(latest)?,
                        })
                    }
                    _ => Self::fixed(config, now),
                }
            }
        }
    }

    fn fixed(config: &IssuanceConfig, now: DateTime<Utc>) -> AppResult<Self> {
        let valid_until = Duration::try_days(i64::from(config.validity_days))
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| {
                AppError::configuration(format!(
                    "issuance.validity_days = {} is out of range",
                    config.validity_days
                ))
            })?;
        Ok(Self {
            valid_from: now,
            valid_until,
        })
    }
}

fn start_of_day(date: NaiveDate) -> AppResult<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::internal(format!("Invalid visit date {date}")))
}

fn end_of_day(date: NaiveDate) -> AppResult<DateTime<Utc>> {
    date.and_hms_micro_opt(23, 59, 59, 999_999)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::internal(format!("Invalid visit date {date}")))
}
