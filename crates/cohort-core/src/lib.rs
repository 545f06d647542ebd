//! Core types and trait definitions for Cohort.
//!
//! Groups and group members live in an internal store and are mirrored onto
//! external membership platforms. This crate holds the entity model, the
//! identifier dispatch machinery and the reconciliation logic; it has no HTTP
//! or database dependencies.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// declarations that need them.
#![allow(async_fn_in_trait)]

pub mod candidate;
pub mod dispatch;
pub mod error;
pub mod external_id;
pub mod group;
pub mod group_member;
pub mod ids;
pub mod outcome;
pub mod record;
pub mod repository;
pub mod scan;
pub mod selector;
pub mod source;
pub mod source_repository;
pub mod sync;
pub mod upsert;

pub use error::{Error, ErrorKind, Result};

#[cfg(test)]
mod fake;
