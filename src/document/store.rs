//! Capability interface of a document store.

use super::{Document, DocumentPath, Query, QuerySnapshot};
use crate::error::DocumentStoreError;
use async_trait::async_trait;
use crossbeam_channel::Receiver;

#[cfg(test)]
use mockall::automock;

/// Identifier of a live listener registered with a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// One delivery on a listener channel.
pub type ListenEvent = std::result::Result<QuerySnapshot, DocumentStoreError>;

/// A registered live listener.
///
/// The first event carries the complete current result set with every
/// document reported as added. Later events arrive strictly in the order
/// the underlying changes happened.
#[derive(Debug)]
pub struct ListenRegistration {
    pub id: ListenerId,
    pub events: Receiver<ListenEvent>,
}

/// Primitive operations the subscription layer needs from a store.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` if it does not exist.
    async fn get_document(
        &self,
        path: &DocumentPath,
    ) -> Result<Option<Document>, DocumentStoreError>;

    /// Run a query. Results are ordered by document id ascending.
    async fn run_query(&self, query: &Query) -> Result<Vec<Document>, DocumentStoreError>;

    /// Register a live listener for a query.
    fn listen(&self, query: &Query) -> Result<ListenRegistration, DocumentStoreError>;

    /// Release a listener. Unknown ids are ignored.
    fn unlisten(&self, id: ListenerId);
}
