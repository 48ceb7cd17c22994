//! In-process document store with live query listeners.

use super::store::{DocumentStore, ListenEvent, ListenRegistration, ListenerId};
use super::{ChangeType, Document, DocumentChange, DocumentPath, Query, QuerySnapshot};
use crate::config::PaymentsConfig;
use crate::error::DocumentStoreError;
use async_trait::async_trait;
use crossbeam_channel::{bounded, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Internal listener state.
struct Listener {
    query: Query,
    sender: Sender<ListenEvent>,
    /// Result set as of the last delivery.
    current: BTreeMap<DocumentPath, Document>,
}

impl Listener {
    /// Try to send an event. Returns false if the buffer is full or the
    /// receiver is gone.
    fn try_send(&self, event: ListenEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }

    /// Fold one document write into the result set.
    ///
    /// Returns the snapshot to deliver, or `None` if the result set did not
    /// change.
    fn apply(&mut self, path: &DocumentPath, written: Option<&Document>) -> Option<QuerySnapshot> {
        let next = written.filter(|doc| self.query.matches(doc));
        let previous = self.current.get(path).cloned();
        let change = match (previous, next) {
            (None, None) => return None,
            (Some(previous), Some(doc)) if &previous == doc => return None,
            (None, Some(doc)) => {
                self.current.insert(path.clone(), doc.clone());
                DocumentChange {
                    change_type: ChangeType::Added,
                    document: doc.clone(),
                }
            }
            (Some(_), Some(doc)) => {
                self.current.insert(path.clone(), doc.clone());
                DocumentChange {
                    change_type: ChangeType::Modified,
                    document: doc.clone(),
                }
            }
            (Some(previous), None) => {
                self.current.remove(path);
                DocumentChange {
                    change_type: ChangeType::Removed,
                    document: previous,
                }
            }
        };

        Some(QuerySnapshot {
            documents: self.current.values().cloned().collect(),
            changes: vec![change],
        })
    }
}

/// Document store held entirely in memory.
///
/// Writes (`set_document`, `delete_document`) stand in for out-of-band
/// updates such as payment-provider webhooks. Each write produces at most one
/// event per matching listener; writes and listener registration are
/// serialized so every listener sees changes in write order.
pub struct MemoryStore {
    documents: RwLock<BTreeMap<DocumentPath, Document>>,
    listeners: Mutex<HashMap<ListenerId, Listener>>,
    next_id: AtomicU64,
    buffer_size: usize,
    /// Serializes writes with listener registration.
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_config(&PaymentsConfig::default())
    }

    /// Create a store whose listener buffers hold `listener_buffer_size` events.
    pub fn from_config(config: &PaymentsConfig) -> Self {
        Self::with_buffer_size(config.listener_buffer_size)
    }

    /// Create a store whose listeners buffer at most `buffer_size` events.
    /// A listener that falls further behind is dropped.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Create or replace a document.
    pub fn set_document(&self, document: Document) -> Result<(), DocumentStoreError> {
        if !document.path.is_document() {
            return Err(DocumentStoreError::InvalidPath(document.path.to_string()));
        }
        let _lock = self.write_lock.lock();

        let path = document.path.clone();
        self.documents.write().insert(path.clone(), document.clone());
        self.broadcast(&path, Some(&document));
        Ok(())
    }

    /// Delete a document. Returns whether it existed.
    pub fn delete_document(&self, path: &DocumentPath) -> bool {
        let _lock = self.write_lock.lock();

        let existed = self.documents.write().remove(path).is_some();
        if existed {
            self.broadcast(path, None);
        }
        existed
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn check_query(query: &Query) -> Result<(), DocumentStoreError> {
        if query.collection.is_document() {
            return Err(DocumentStoreError::InvalidQuery(format!(
                "{} is not a collection",
                query.collection
            )));
        }
        Ok(())
    }

    fn query_documents(&self, query: &Query) -> Vec<Document> {
        self.documents
            .read()
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect()
    }

    /// Deliver one write to every listener. Drops listeners that fail to receive.
    fn broadcast(&self, path: &DocumentPath, written: Option<&Document>) {
        let mut listeners = self.listeners.lock();
        let mut to_remove = Vec::new();

        for (id, listener) in listeners.iter_mut() {
            if let Some(snapshot) = listener.apply(path, written) {
                if !listener.try_send(Ok(snapshot)) {
                    to_remove.push(*id);
                }
            }
        }

        for id in to_remove {
            warn!(listener = id.0, "dropping listener that cannot keep up");
            listeners.remove(&id);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(
        &self,
        path: &DocumentPath,
    ) -> Result<Option<Document>, DocumentStoreError> {
        if !path.is_document() {
            return Err(DocumentStoreError::InvalidPath(path.to_string()));
        }
        Ok(self.documents.read().get(path).cloned())
    }

    async fn run_query(&self, query: &Query) -> Result<Vec<Document>, DocumentStoreError> {
        Self::check_query(query)?;
        Ok(self.query_documents(query))
    }

    fn listen(&self, query: &Query) -> Result<ListenRegistration, DocumentStoreError> {
        Self::check_query(query)?;
        let _lock = self.write_lock.lock();

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, events) = bounded(self.buffer_size);

        let documents = self.query_documents(query);
        let initial = QuerySnapshot {
            changes: documents
                .iter()
                .map(|doc| DocumentChange {
                    change_type: ChangeType::Added,
                    document: doc.clone(),
                })
                .collect(),
            documents: documents.clone(),
        };

        let listener = Listener {
            query: query.clone(),
            sender,
            current: documents
                .into_iter()
                .map(|doc| (doc.path.clone(), doc))
                .collect(),
        };
        if !listener.try_send(Ok(initial)) {
            return Err(DocumentStoreError::ListenerDropped);
        }

        debug!(listener = id.0, collection = %query.collection, "listener registered");
        self.listeners.lock().insert(id, listener);

        Ok(ListenRegistration { id, events })
    }

    fn unlisten(&self, id: ListenerId) {
        if self.listeners.lock().remove(&id).is_some() {
            debug!(listener = id.0, "listener released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldValue;
    use std::time::Duration;

    fn doc(uid: &str, id: &str, status: &str) -> Document {
        let path = DocumentPath::parse(&format!("customers/{uid}/subscriptions/{id}")).unwrap();
        Document::new(path).with_field("status", status)
    }

    fn subscriptions_of(uid: &str) -> Query {
        Query::new(DocumentPath::parse(&format!("customers/{uid}/subscriptions")).unwrap())
    }

    #[test]
    fn test_listen_delivers_initial_state() {
        let store = MemoryStore::new();
        store.set_document(doc("alice", "b", "active")).unwrap();
        store.set_document(doc("alice", "a", "active")).unwrap();
        store.set_document(doc("bob", "c", "active")).unwrap();

        let registration = store.listen(&subscriptions_of("alice")).unwrap();
        let snapshot = registration
            .events
            .recv_timeout(Duration::from_millis(100))
            .unwrap()
            .unwrap();

        let ids: Vec<_> = snapshot.documents.iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(snapshot.changes.len(), 2);
        assert!(snapshot
            .changes
            .iter()
            .all(|c| c.change_type == ChangeType::Added));
    }

    #[test]
    fn test_write_produces_single_change() {
        let store = MemoryStore::new();
        store.set_document(doc("alice", "a", "active")).unwrap();

        let registration = store.listen(&subscriptions_of("alice")).unwrap();
        registration.events.recv().unwrap().unwrap();

        store.set_document(doc("alice", "a", "past_due")).unwrap();
        let snapshot = registration.events.recv().unwrap().unwrap();
        assert_eq!(snapshot.changes.len(), 1);
        assert_eq!(snapshot.changes[0].change_type, ChangeType::Modified);

        let path = DocumentPath::parse("customers/alice/subscriptions/a").unwrap();
        assert!(store.delete_document(&path));
        let snapshot = registration.events.recv().unwrap().unwrap();
        assert_eq!(snapshot.changes[0].change_type, ChangeType::Removed);
        assert_eq!(
            snapshot.changes[0].document.get("status"),
            Some(&FieldValue::from("past_due"))
        );
        assert!(snapshot.documents.is_empty());
    }

    #[test]
    fn test_unrelated_writes_are_not_delivered() {
        let store = MemoryStore::new();
        let registration = store.listen(&subscriptions_of("alice")).unwrap();
        registration.events.recv().unwrap().unwrap();

        store.set_document(doc("bob", "x", "active")).unwrap();
        assert!(registration
            .events
            .recv_timeout(Duration::from_millis(50))
            .is_err());
    }

    #[test]
    fn test_unlisten_disconnects() {
        let store = MemoryStore::new();
        let registration = store.listen(&subscriptions_of("alice")).unwrap();
        assert_eq!(store.listener_count(), 1);

        store.unlisten(registration.id);
        store.unlisten(registration.id);
        assert_eq!(store.listener_count(), 0);

        registration.events.recv().unwrap().unwrap();
        assert!(registration.events.recv().is_err());
    }

    #[test]
    fn test_drop_slow_listener() {
        let store = MemoryStore::with_buffer_size(2);
        let _registration = store.listen(&subscriptions_of("alice")).unwrap();

        for i in 0..10 {
            store
                .set_document(doc("alice", &format!("s{i}"), "active"))
                .unwrap();
        }

        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_buffer_size_follows_config() {
        let config = PaymentsConfig {
            listener_buffer_size: 3,
            ..Default::default()
        };
        let store = MemoryStore::from_config(&config);
        assert_eq!(store.buffer_size, 3);
        assert_eq!(MemoryStore::new().buffer_size, PaymentsConfig::default().listener_buffer_size);

        // Initial snapshot plus three writes overflow a buffer of three.
        let _registration = store.listen(&subscriptions_of("alice")).unwrap();
        for i in 0..2 {
            store
                .set_document(doc("alice", &format!("s{i}"), "active"))
                .unwrap();
        }
        assert_eq!(store.listener_count(), 1);
        store.set_document(doc("alice", "s2", "active")).unwrap();
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_rejects_collection_as_document() {
        let store = MemoryStore::new();
        let path = DocumentPath::parse("customers/alice/subscriptions").unwrap();
        assert!(store.set_document(Document::new(path)).is_err());
    }
}
