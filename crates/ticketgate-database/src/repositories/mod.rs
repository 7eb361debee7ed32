//! PostgreSQL implementations of the persistence traits.

pub mod attraction;
pub mod purchase;
pub mod redemption;
pub mod ticket;

pub use attraction::PgAttractionDirectory;
pub use purchase::PgPurchaseSource;
pub use redemption::RedemptionAttemptRepository;
pub use ticket::PgTicketStore;
