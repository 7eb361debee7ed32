//! Ticket issuance: turning completed purchases into group tickets.

pub mod backfill;
pub mod code;
pub mod encoder;
pub mod issuer;
pub mod validity;

pub use backfill::{BackfillReport, IssuanceBackfill};
pub use code::TicketCodeGenerator;
pub use encoder::InlinePayloadEncoder;
pub use issuer::TicketIssuer;
pub use validity::ValidityWindow;
