//! Storage Layer - SQLite-backed persistence
//!
//! One table per entity, one column per physical column of its metadata.
//! The store only ever sees flat rows; nesting lives in the mapper.

pub mod schema;
pub mod sqlite;

pub use sqlite::{QueryLogging, SqliteStore};
