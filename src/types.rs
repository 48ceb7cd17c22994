//! Core domain types for billing subscriptions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form string metadata attached to a subscription.
pub type Metadata = BTreeMap<String, String>;

/// Lifecycle status of a subscription, as written by the payment provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Trialing,
    Unpaid,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 7] = [
        SubscriptionStatus::Active,
        SubscriptionStatus::Canceled,
        SubscriptionStatus::Incomplete,
        SubscriptionStatus::IncompleteExpired,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Unpaid,
    ];

    /// Stored name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Unpaid => "unpaid",
        }
    }

    /// Parse a stored status name.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (product, price) pair resolved from a price reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPrice {
    pub product_id: String,
    pub price_id: String,
}

/// A billing subscription owned by one user.
///
/// Timestamps are UTC strings in RFC 1123 form
/// (`Tue, 14 Mar 2023 10:00:00 GMT`). Optional ones are `None` when the
/// stored value is absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub uid: String,
    pub status: SubscriptionStatus,

    pub created: String,
    pub current_period_start: String,
    pub current_period_end: String,
    pub cancel_at: Option<String>,
    pub canceled_at: Option<String>,
    pub ended_at: Option<String>,
    pub trial_start: Option<String>,
    pub trial_end: Option<String>,
    pub cancel_at_period_end: bool,

    pub price_id: String,
    pub product_id: String,
    /// Every price on the subscription; the first entry is the primary price.
    pub prices: Vec<SubscriptionPrice>,
    pub quantity: Option<i64>,
    pub role: Option<String>,
    pub metadata: Metadata,
    pub stripe_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names_round_trip() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubscriptionStatus::parse("paused"), None);
        assert_eq!(SubscriptionStatus::PastDue.to_string(), "past_due");
    }

    #[test]
    fn test_status_serde_matches_stored_names() {
        let json = serde_json::to_string(&SubscriptionStatus::IncompleteExpired).unwrap();
        assert_eq!(json, "\"incomplete_expired\"");
    }
}
