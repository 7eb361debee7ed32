//! Collaborator traits defined in `ticketgate-core` and implemented by other crates.

pub mod clock;
pub mod encoder;

pub use clock::{Clock, ManualClock, SystemClock};
pub use encoder::ScanPayloadEncoder;
