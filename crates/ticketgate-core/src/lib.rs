//! # ticketgate-core
//!
//! Core crate for TicketGate. Contains configuration schemas, typed
//! identifiers, pagination types, collaborator traits (clock, scan payload
//! encoder), and the unified error system.
//!
//! This crate has **no** internal dependencies on other TicketGate crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
