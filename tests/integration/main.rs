//! Integration tests for TicketGate.
//!
//! Scenario tests run against the in-memory store. Tests marked
//! `#[ignore]` need a PostgreSQL database named by `TICKETGATE_TEST_DATABASE_URL`.


mod concurrency_test;
mod issuance_test;
mod lookup_test;
mod postgres_test;
mod redemption_test;
