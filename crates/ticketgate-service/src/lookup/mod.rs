//! Read-only projections for the scanner UI.

pub mod history;
pub mod service;
pub mod snapshot;

pub use history::ScanHistoryService;
pub use service::ScanLookupService;
pub use snapshot::{AttractionEntitlement, TicketSnapshot, ValidationReport};
