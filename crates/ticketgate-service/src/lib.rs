//! # ticketgate-service
//!
//! Business logic for TicketGate: issuing group tickets for completed
//! purchases, redeeming quota at the gate, and read-only scan lookups.
//!
//! Services follow constructor injection; all collaborators are provided
//! at construction time via `Arc` references.

pub mod issuance;
pub mod lookup;
pub mod redemption;

pub use issuance::{
    BackfillReport, InlinePayloadEncoder, IssuanceBackfill, TicketCodeGenerator, TicketIssuer,
};
pub use lookup::{ScanHistoryService, ScanLookupService, TicketSnapshot, ValidationReport};
pub use redemption::{RedeemRequest, RedemptionEngine, RedemptionOutcome};
