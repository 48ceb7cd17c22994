//! Document store primitives.
//!
//! This module models the remote document database the subscription layer
//! reads from:
//! - Slash-separated paths for collections and documents
//! - Typed field values, including timestamps and references
//! - Collection queries with equality and set-membership filters
//! - Live listeners delivering full result sets plus change-logs
//!
//! [`MemoryStore`] is a complete in-process implementation of
//! [`DocumentStore`].

mod memory;
mod path;
mod query;
mod store;
mod value;

pub use memory::MemoryStore;
pub use path::DocumentPath;
pub use query::{ChangeType, DocumentChange, FieldFilter, FilterOp, Query, QuerySnapshot};
pub use store::{DocumentStore, ListenEvent, ListenRegistration, ListenerId};
pub use value::{Document, FieldValue};

#[cfg(test)]
pub use store::MockDocumentStore;
