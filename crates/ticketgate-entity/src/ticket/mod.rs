//! Group ticket domain entities.

pub mod model;
pub mod status;

pub use model::{GroupTicket, NewGroupTicket};
pub use status::{TicketStatus, derive_status};
