//! # ticketgate-database
//!
//! The persistence boundary of TicketGate: the [`TicketStore`] and
//! [`TicketUnitOfWork`] traits, their PostgreSQL and in-memory
//! implementations, the read-only checkout and catalog collaborators, and
//! connection/migration management.

pub mod connection;
pub mod error;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::{MemoryAttractionDirectory, MemoryPurchaseSource, MemoryTicketStore};
pub use repositories::{
    PgAttractionDirectory, PgPurchaseSource, PgTicketStore, RedemptionAttemptRepository,
};
pub use store::{AttractionDirectory, PurchaseSource, TicketStore, TicketUnitOfWork};
