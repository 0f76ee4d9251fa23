//! Repository layer for database access.
//!
//! Implements the Repository Pattern so the engine never touches SQL
//! directly and tests can swap in alternative stores.

pub mod delivery_log;

pub use delivery_log::*;
