//! Subscription query construction.

use crate::document::{DocumentPath, FieldValue, FilterOp, Query};
use crate::error::{PaymentsError, Result};
use crate::types::SubscriptionStatus;

/// Name of the per-customer subscriptions subcollection.
pub const SUBSCRIPTIONS_COLLECTION: &str = "subscriptions";

/// Status restriction for one-shot subscription queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    One(SubscriptionStatus),
    Many(Vec<SubscriptionStatus>),
}

impl StatusFilter {
    /// Normalize into a non-empty set, keeping first-seen order.
    pub fn to_set(&self) -> Result<Vec<SubscriptionStatus>> {
        match self {
            StatusFilter::One(status) => Ok(vec![*status]),
            StatusFilter::Many(statuses) if statuses.is_empty() => Err(
                PaymentsError::InvalidArgument("status must be a non-empty list".to_string()),
            ),
            StatusFilter::Many(statuses) => {
                let mut set = Vec::with_capacity(statuses.len());
                for status in statuses {
                    if !set.contains(status) {
                        set.push(*status);
                    }
                }
                Ok(set)
            }
        }
    }
}

impl From<SubscriptionStatus> for StatusFilter {
    fn from(status: SubscriptionStatus) -> Self {
        StatusFilter::One(status)
    }
}

impl From<Vec<SubscriptionStatus>> for StatusFilter {
    fn from(statuses: Vec<SubscriptionStatus>) -> Self {
        StatusFilter::Many(statuses)
    }
}

/// Options for listing subscriptions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionQueryOptions {
    /// Only return subscriptions in one of these states (None = all).
    pub status: Option<StatusFilter>,
}

impl SubscriptionQueryOptions {
    pub fn with_status(status: impl Into<StatusFilter>) -> Self {
        Self {
            status: Some(status.into()),
        }
    }
}

/// Reject ids that are empty or would escape their path segment.
pub(crate) fn check_segment(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PaymentsError::InvalidArgument(format!(
            "{name} must be a non-empty string"
        )));
    }
    if value.contains('/') {
        return Err(PaymentsError::InvalidArgument(format!(
            "{name} must not contain '/': {value:?}"
        )));
    }
    Ok(())
}

/// Path of a user's subscriptions collection.
pub fn subscriptions_collection(customers: &str, uid: &str) -> Result<DocumentPath> {
    check_segment("uid", uid)?;
    DocumentPath::collection(customers)
        .and_then(|path| path.child(uid))
        .and_then(|path| path.child(SUBSCRIPTIONS_COLLECTION))
        .map_err(|e| PaymentsError::InvalidArgument(e.to_string()))
}

/// Build the query over a user's subscriptions, optionally restricted to a
/// set of statuses.
pub fn subscriptions_query(
    customers: &str,
    uid: &str,
    statuses: Option<&[SubscriptionStatus]>,
) -> Result<Query> {
    let query = Query::new(subscriptions_collection(customers, uid)?);
    match statuses {
        None => Ok(query),
        Some([]) => Err(PaymentsError::InvalidArgument(
            "status filter must not be empty".to_string(),
        )),
        Some(statuses) => {
            let values = statuses
                .iter()
                .map(|status| FieldValue::from(status.as_str()))
                .collect();
            Ok(query.filter("status", FilterOp::In(values)))
        }
    }
}
