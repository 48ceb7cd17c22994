//! Reconciling listener deliveries into subscription snapshots.

use crate::converter::DocumentConverter;
use crate::document::{ChangeType, QuerySnapshot};
use crate::error::ConversionError;
use crate::types::Subscription;

/// One change since the previous snapshot.
///
/// For `Removed` the subscription is the last state seen before removal.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionChange {
    pub change_type: ChangeType,
    pub subscription: Subscription,
}

/// Complete view of a user's subscriptions at one point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionSnapshot {
    /// Every current subscription, ordered by id.
    pub subscriptions: Vec<Subscription>,
    /// Changes since the previous snapshot, in the order they happened.
    pub changes: Vec<SubscriptionChange>,
    pub size: usize,
    pub empty: bool,
}

impl SubscriptionSnapshot {
    /// Look up a subscription by id.
    pub fn get(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|sub| sub.id == id)
    }
}

/// Build a snapshot from one listener delivery.
///
/// The subscription list is always recomputed from the full result set;
/// change entries keep the store's order and tags.
pub fn reconcile<C>(
    converter: &C,
    snapshot: &QuerySnapshot,
) -> Result<SubscriptionSnapshot, ConversionError>
where
    C: DocumentConverter<Subscription>,
{
    let subscriptions = snapshot
        .documents
        .iter()
        .map(|doc| converter.from_storage(doc))
        .collect::<Result<Vec<_>, _>>()?;

    let changes = snapshot
        .changes
        .iter()
        .map(|change| {
            Ok(SubscriptionChange {
                change_type: change.change_type,
                subscription: converter.from_storage(&change.document)?,
            })
        })
        .collect::<Result<Vec<_>, ConversionError>>()?;

    let size = subscriptions.len();
    Ok(SubscriptionSnapshot {
        subscriptions,
        changes,
        size,
        empty: size == 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::SubscriptionConverter;
    use crate::document::{Document, DocumentChange, DocumentPath, FieldValue};
    use chrono::{TimeZone, Utc};

    fn subscription_doc(id: &str, status: &str) -> Document {
        let path = |p: &str| DocumentPath::parse(p).unwrap();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Document::new(path(&format!("customers/alice/subscriptions/{id}")))
            .with_field("status", status)
            .with_field("created", now)
            .with_field("current_period_start", now)
            .with_field("current_period_end", now)
            .with_field("price", path("products/p/prices/pr"))
            .with_field("product", path("products/p"))
            .with_field(
                "prices",
                FieldValue::Array(vec![path("products/p/prices/pr").into()]),
            )
            .with_field("stripeLink", "https://example.test")
    }

    #[test]
    fn test_reconcile_keeps_order_and_tags() {
        let snapshot = QuerySnapshot {
            documents: vec![subscription_doc("a", "active"), subscription_doc("b", "unpaid")],
            changes: vec![
                DocumentChange {
                    change_type: ChangeType::Removed,
                    document: subscription_doc("c", "canceled"),
                },
                DocumentChange {
                    change_type: ChangeType::Modified,
                    document: subscription_doc("b", "unpaid"),
                },
            ],
        };

        let result = reconcile(&SubscriptionConverter, &snapshot).unwrap();
        assert_eq!(result.size, 2);
        assert!(!result.empty);
        assert_eq!(result.subscriptions[0].id, "a");
        assert_eq!(result.subscriptions[1].id, "b");
        assert_eq!(result.changes[0].change_type, ChangeType::Removed);
        assert_eq!(result.changes[0].subscription.id, "c");
        assert_eq!(result.changes[1].change_type, ChangeType::Modified);
        assert!(result.get("b").is_some());
        assert!(result.get("c").is_none());
    }

    #[test]
    fn test_reconcile_empty() {
        let result = reconcile(&SubscriptionConverter, &QuerySnapshot::default()).unwrap();
        assert_eq!(result.size, 0);
        assert!(result.empty);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_reconcile_fails_on_bad_document() {
        let mut broken = subscription_doc("a", "active");
        broken.fields.remove("created");
        let snapshot = QuerySnapshot {
            documents: vec![broken],
            changes: vec![],
        };
        assert!(reconcile(&SubscriptionConverter, &snapshot).is_err());
    }
}
