//! Indexes a feed log into a [feedidx_datastore::Store].
//!
//! A feed log is newline-delimited JSON, one signed message per line, as exported by the replication layer.  Each
//! line goes through the same steps:
//!
//! - [decode] turns the line into a [Message], or reports it as a [MalformedRecord] to be skipped.
//! - [project] works out which author rows the message creates or updates.  Only an author's own `about` messages
//!   may change their profile.
//! - [message_row] builds the `msgs` row which is upserted by key.
//!
//! The [Ingestor] drives this over a reader, committing every `commit_every` messages and stopping after `limit`.
mod config;
mod error;
mod ingestor;
mod message;
mod projector;
mod report;
mod writer;

pub use config::*;
pub use error::*;
pub use ingestor::*;
pub use message::*;
pub use projector::*;
pub use report::*;
pub use writer::*;
