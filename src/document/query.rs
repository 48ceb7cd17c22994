//! Collection queries and query results.

use super::{Document, DocumentPath, FieldValue};

/// Comparison applied by a field filter.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOp {
    Equal(FieldValue),
    /// Field value is a member of the set.
    In(Vec<FieldValue>),
}

/// Filter on a single top-level field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
}

impl FieldFilter {
    pub fn matches(&self, document: &Document) -> bool {
        let Some(value) = document.get(&self.field) else {
            return false;
        };
        match &self.op {
            FilterOp::Equal(expected) => value == expected,
            FilterOp::In(values) => values.contains(value),
        }
    }
}

/// Query over the direct children of one collection.
///
/// Results are ordered by document id ascending.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub collection: DocumentPath,
    pub filters: Vec<FieldFilter>,
}

impl Query {
    pub fn new(collection: DocumentPath) -> Self {
        Self {
            collection,
            filters: Vec::new(),
        }
    }

    /// Add a filter. All filters must match.
    pub fn filter(mut self, field: &str, op: FilterOp) -> Self {
        self.filters.push(FieldFilter {
            field: field.to_string(),
            op,
        });
        self
    }

    /// Whether the document lives in the queried collection.
    pub fn covers(&self, path: &DocumentPath) -> bool {
        path.parent().as_ref() == Some(&self.collection)
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.covers(&document.path) && self.filters.iter().all(|f| f.matches(document))
    }
}

/// Kind of change reported by a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

/// One entry in a listener change-log.
///
/// For `Removed` the document is the last state seen before removal.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentChange {
    pub change_type: ChangeType,
    pub document: Document,
}

/// Full result set of a query plus the changes since the previous delivery.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySnapshot {
    pub documents: Vec<Document>,
    pub changes: Vec<DocumentChange>,
}
