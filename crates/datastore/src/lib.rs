//! The datastore crate.
//!
//! This crate holds the relational side of the indexer: the two tables a feed log is materialized into, and the
//! operations the ingest pipeline is allowed to run against them.  There are 3 primary pieces:
//!
//! - The rows ([MessageRow], [AuthorRow]) and the author columns which may be patched ([AuthorField]).
//! - The [Store] trait, which is the only surface the pipeline sees.  It is deliberately shaped like a handful of
//!   prepared statements plus explicit transaction control.
//! - Two implementations: [SqliteStore], backed by rusqlite, and [MemoryStore], a map-backed store used by tests and
//!   benchmarks.
//!
//! The schema itself lives in [schema] and is shared by anything that wants to create or inspect the tables.
mod database;
mod error;
mod memory;
mod rows;
pub mod schema;
mod store;

pub use database::*;
pub use error::*;
pub use memory::*;
pub use rows::*;
pub use store::*;
