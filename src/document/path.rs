//! Slash-separated document and collection paths.

use crate::error::DocumentStoreError;
use std::fmt;

/// Path to a collection or document, e.g. `customers/u1/subscriptions/sub_1`.
///
/// Odd-length paths name collections, even-length paths name documents.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Parse a slash-separated path. Empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self, DocumentStoreError> {
        let segments: Vec<String> = path.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(DocumentStoreError::InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// Path of a top-level collection.
    pub fn collection(name: &str) -> Result<Self, DocumentStoreError> {
        let mut path = Self {
            segments: Vec::new(),
        };
        path.push(name)?;
        Ok(path)
    }

    /// Append one segment.
    pub fn child(&self, segment: &str) -> Result<Self, DocumentStoreError> {
        let mut path = self.clone();
        path.push(segment)?;
        Ok(path)
    }

    fn push(&mut self, segment: &str) -> Result<(), DocumentStoreError> {
        if segment.is_empty() || segment.contains('/') {
            return Err(DocumentStoreError::InvalidPath(format!(
                "{}/{}",
                self, segment
            )));
        }
        self.segments.push(segment.to_string());
        Ok(())
    }

    /// Last segment.
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Path with the last segment removed, or `None` at the root.
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_document(&self) -> bool {
        !self.segments.is_empty() && self.segments.len() % 2 == 0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Debug for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentPath({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_navigate() {
        let path = DocumentPath::parse("products/prod_1/prices/price_1").unwrap();
        assert!(path.is_document());
        assert_eq!(path.id(), "price_1");

        let product = path.parent().and_then(|p| p.parent()).unwrap();
        assert_eq!(product.id(), "prod_1");
        assert_eq!(product.to_string(), "products/prod_1");
    }

    #[test]
    fn test_rejects_empty_and_nested_segments() {
        assert!(DocumentPath::parse("customers//subscriptions").is_err());
        assert!(DocumentPath::parse("").is_err());

        let customers = DocumentPath::collection("customers").unwrap();
        assert!(customers.child("a/b").is_err());
        assert!(customers.child("").is_err());
    }

    #[test]
    fn test_parent_of_root_is_none() {
        let customers = DocumentPath::collection("customers").unwrap();
        assert!(customers.parent().is_none());
        assert!(!customers.is_document());
    }
}
