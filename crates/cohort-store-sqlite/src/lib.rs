//! SQLite backend for the Cohort group store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Secondary lookups (slug, course id,
//! platform ids, participant id) are unique indexes, so a lost create race
//! surfaces as a conflict rather than a duplicate.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
