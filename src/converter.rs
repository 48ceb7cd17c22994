//! Mapping between stored documents and domain values.

use crate::document::{Document, DocumentPath, FieldValue};
use crate::error::ConversionError;
use crate::types::{Metadata, Subscription, SubscriptionPrice, SubscriptionStatus};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Two-way mapping between a stored document and a value of type `T`.
pub trait DocumentConverter<T> {
    /// Build a value from a stored document.
    fn from_storage(&self, document: &Document) -> Result<T, ConversionError>;

    /// Build storable fields from a value.
    fn to_storage(&self, value: &T) -> Result<BTreeMap<String, FieldValue>, ConversionError>;
}

/// Format an instant the way subscription timestamps are exposed,
/// e.g. `Tue, 14 Mar 2023 10:00:00 GMT`.
pub fn to_utc_string(instant: &DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Read-only converter for subscription documents stored at
/// `{customers}/{uid}/subscriptions/{id}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubscriptionConverter;

impl DocumentConverter<Subscription> for SubscriptionConverter {
    fn from_storage(&self, document: &Document) -> Result<Subscription, ConversionError> {
        let fields = Fields { document };

        let prices = fields
            .array("prices")?
            .iter()
            .map(|value| match value {
                FieldValue::Reference(path) => fields.price(path),
                _ => Err(fields.invalid("prices", "array of price references")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let status = fields.string("status")?;
        let status = SubscriptionStatus::parse(status)
            .ok_or_else(|| fields.invalid("status", "subscription status"))?;

        Ok(Subscription {
            id: document.id().to_string(),
            uid: owner_of(&document.path)?,
            status,
            created: fields.timestamp("created")?,
            current_period_start: fields.timestamp("current_period_start")?,
            current_period_end: fields.timestamp("current_period_end")?,
            cancel_at: fields.optional_timestamp("cancel_at")?,
            canceled_at: fields.optional_timestamp("canceled_at")?,
            ended_at: fields.optional_timestamp("ended_at")?,
            trial_start: fields.optional_timestamp("trial_start")?,
            trial_end: fields.optional_timestamp("trial_end")?,
            cancel_at_period_end: fields.optional_bool("cancel_at_period_end")?.unwrap_or(false),
            price_id: fields.reference("price")?.id().to_string(),
            product_id: fields.reference("product")?.id().to_string(),
            prices,
            quantity: fields.optional_integer("quantity")?,
            role: fields.optional_string("role")?,
            metadata: fields.metadata("metadata")?,
            stripe_link: fields.string("stripeLink")?.to_string(),
        })
    }

    fn to_storage(
        &self,
        _value: &Subscription,
    ) -> Result<BTreeMap<String, FieldValue>, ConversionError> {
        Err(ConversionError::Unsupported(
            "subscriptions are read-only and cannot be written back".to_string(),
        ))
    }
}

/// Owning user id: two levels above the subscription document.
fn owner_of(path: &DocumentPath) -> Result<String, ConversionError> {
    path.parent()
        .and_then(|collection| collection.parent())
        .map(|owner| owner.id().to_string())
        .ok_or_else(|| ConversionError::InvalidPath(path.to_string()))
}

/// Typed field access with errors naming the offending document.
struct Fields<'a> {
    document: &'a Document,
}

impl<'a> Fields<'a> {
    fn missing(&self, field: &str) -> ConversionError {
        ConversionError::MissingField {
            path: self.document.path.to_string(),
            field: field.to_string(),
        }
    }

    fn invalid(&self, field: &str, expected: &'static str) -> ConversionError {
        ConversionError::InvalidField {
            path: self.document.path.to_string(),
            field: field.to_string(),
            expected,
            found: self
                .document
                .get(field)
                .map(FieldValue::type_name)
                .unwrap_or("nothing"),
        }
    }

    /// Present, non-null value.
    fn get(&self, field: &str) -> Option<&'a FieldValue> {
        self.document.get(field).filter(|value| !value.is_null())
    }

    fn required(&self, field: &str) -> Result<&'a FieldValue, ConversionError> {
        self.get(field).ok_or_else(|| self.missing(field))
    }

    fn string(&self, field: &str) -> Result<&'a str, ConversionError> {
        match self.required(field)? {
            FieldValue::String(value) => Ok(value),
            _ => Err(self.invalid(field, "string")),
        }
    }

    fn optional_string(&self, field: &str) -> Result<Option<String>, ConversionError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(self.invalid(field, "string")),
        }
    }

    fn optional_bool(&self, field: &str) -> Result<Option<bool>, ConversionError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Boolean(value)) => Ok(Some(*value)),
            Some(_) => Err(self.invalid(field, "boolean")),
        }
    }

    fn optional_integer(&self, field: &str) -> Result<Option<i64>, ConversionError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Integer(value)) => Ok(Some(*value)),
            Some(_) => Err(self.invalid(field, "integer")),
        }
    }

    fn timestamp(&self, field: &str) -> Result<String, ConversionError> {
        self.optional_timestamp(field)?
            .ok_or_else(|| self.missing(field))
    }

    fn optional_timestamp(&self, field: &str) -> Result<Option<String>, ConversionError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Timestamp(instant)) => Ok(Some(to_utc_string(instant))),
            Some(_) => Err(self.invalid(field, "timestamp")),
        }
    }

    fn reference(&self, field: &str) -> Result<&'a DocumentPath, ConversionError> {
        match self.required(field)? {
            FieldValue::Reference(path) => Ok(path),
            _ => Err(self.invalid(field, "reference")),
        }
    }

    fn array(&self, field: &str) -> Result<&'a [FieldValue], ConversionError> {
        match self.required(field)? {
            FieldValue::Array(values) => Ok(values),
            _ => Err(self.invalid(field, "array")),
        }
    }

    /// Resolve `products/{product}/prices/{price}` into its two ids.
    fn price(&self, path: &DocumentPath) -> Result<SubscriptionPrice, ConversionError> {
        let product = path
            .parent()
            .and_then(|prices| prices.parent())
            .ok_or_else(|| self.invalid("prices", "nested price reference"))?;

        Ok(SubscriptionPrice {
            product_id: product.id().to_string(),
            price_id: path.id().to_string(),
        })
    }

    fn metadata(&self, field: &str) -> Result<Metadata, ConversionError> {
        match self.get(field) {
            None => Ok(Metadata::new()),
            Some(FieldValue::Map(entries)) => entries
                .iter()
                .map(|(key, value)| match value {
                    FieldValue::String(text) => Ok((key.clone(), text.clone())),
                    _ => Err(self.invalid(field, "map of strings")),
                })
                .collect(),
            Some(_) => Err(self.invalid(field, "map of strings")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn path(p: &str) -> DocumentPath {
        DocumentPath::parse(p).unwrap()
    }

    fn instant(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn minimal_document() -> Document {
        Document::new(path("customers/alice/subscriptions/sub_1"))
            .with_field("status", "active")
            .with_field("created", instant(1_678_788_000))
            .with_field("current_period_start", instant(1_678_788_000))
            .with_field("current_period_end", instant(1_681_466_400))
            .with_field("price", path("products/prod_1/prices/price_1"))
            .with_field("product", path("products/prod_1"))
            .with_field(
                "prices",
                FieldValue::Array(vec![
                    path("products/prod_1/prices/price_1").into(),
                    path("products/prod_2/prices/price_9").into(),
                ]),
            )
            .with_field("stripeLink", "https://dashboard.stripe.com/subscriptions/sub_1")
    }

    #[test]
    fn test_from_storage_minimal() {
        let sub = SubscriptionConverter
            .from_storage(&minimal_document())
            .unwrap();

        assert_eq!(sub.id, "sub_1");
        assert_eq!(sub.uid, "alice");
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.created, "Tue, 14 Mar 2023 10:00:00 GMT");
        assert_eq!(sub.price_id, "price_1");
        assert_eq!(sub.product_id, "prod_1");
        assert_eq!(
            sub.prices,
            vec![
                SubscriptionPrice {
                    product_id: "prod_1".into(),
                    price_id: "price_1".into()
                },
                SubscriptionPrice {
                    product_id: "prod_2".into(),
                    price_id: "price_9".into()
                },
            ]
        );
        assert!(!sub.cancel_at_period_end);
        assert_eq!(sub.cancel_at, None);
        assert_eq!(sub.trial_end, None);
        assert_eq!(sub.quantity, None);
        assert_eq!(sub.role, None);
        assert!(sub.metadata.is_empty());
    }

    #[test]
    fn test_from_storage_optional_fields() {
        let mut metadata = BTreeMap::new();
        metadata.insert("plan".to_string(), FieldValue::from("team"));

        let document = minimal_document()
            .with_field("cancel_at", instant(0))
            .with_field("trial_end", FieldValue::Null)
            .with_field("cancel_at_period_end", true)
            .with_field("quantity", 3i64)
            .with_field("role", "premium")
            .with_field("metadata", FieldValue::Map(metadata));

        let sub = SubscriptionConverter.from_storage(&document).unwrap();
        assert_eq!(sub.cancel_at.as_deref(), Some("Thu, 01 Jan 1970 00:00:00 GMT"));
        assert_eq!(sub.trial_end, None);
        assert!(sub.cancel_at_period_end);
        assert_eq!(sub.quantity, Some(3));
        assert_eq!(sub.role.as_deref(), Some("premium"));
        assert_eq!(sub.metadata.get("plan").map(String::as_str), Some("team"));
    }

    #[test]
    fn test_missing_required_reference() {
        let mut document = minimal_document();
        document.fields.remove("price");

        let err = SubscriptionConverter.from_storage(&document).unwrap_err();
        assert!(matches!(err, ConversionError::MissingField { ref field, .. } if field == "price"));
    }

    #[test]
    fn test_unknown_status_is_invalid() {
        let document = minimal_document().with_field("status", "paused");
        let err = SubscriptionConverter.from_storage(&document).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidField { ref field, .. } if field == "status"));
    }

    #[test]
    fn test_wrong_type_names_stored_type() {
        let document = minimal_document().with_field("quantity", "three");
        let err = SubscriptionConverter.from_storage(&document).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::InvalidField {
                expected: "integer",
                found: "string",
                ..
            }
        ));
        assert!(err.to_string().contains("expected integer, found string"));
    }

    #[test]
    fn test_to_storage_is_unsupported() {
        let sub = SubscriptionConverter
            .from_storage(&minimal_document())
            .unwrap();
        let err = SubscriptionConverter.to_storage(&sub).unwrap_err();
        assert!(matches!(err, ConversionError::Unsupported(_)));
    }
}
