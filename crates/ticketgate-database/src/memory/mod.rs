//! In-memory implementations of the persistence traits for single-node
//! deployments and tests.

pub mod attraction;
pub mod purchase;
pub mod ticket;

pub use attraction::MemoryAttractionDirectory;
pub use purchase::MemoryPurchaseSource;
pub use ticket::MemoryTicketStore;
