//! Database models.
//!
//! These models map directly to the database schema. JSON columns are
//! stored as serialized strings and decoded on access.

pub mod delivery_log;

pub use delivery_log::*;
