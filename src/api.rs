//! Subscription functions for the signed-in user.

use crate::context::PaymentsContext;
use crate::error::{PaymentsError, Result};
use crate::listen::{ErrorCallback, SubscriptionFeed, SubscriptionListener, SubscriptionSnapshot};
use crate::query::SubscriptionQueryOptions;
use crate::types::Subscription;

/// Fetch one subscription of the signed-in user.
pub async fn get_current_user_subscription(
    payments: &PaymentsContext,
    subscription_id: &str,
) -> Result<Subscription> {
    if subscription_id.is_empty() {
        return Err(PaymentsError::InvalidArgument(
            "subscription id must be a non-empty string".to_string(),
        ));
    }
    let uid = payments.identity().current_user().await?;
    payments
        .subscription_dao()
        .get_subscription(&uid, subscription_id)
        .await
}

/// Fetch the signed-in user's subscriptions, optionally filtered by status.
pub async fn get_current_user_subscriptions(
    payments: &PaymentsContext,
    options: &SubscriptionQueryOptions,
) -> Result<Vec<Subscription>> {
    if let Some(status) = &options.status {
        status.to_set()?;
    }
    let uid = payments.identity().current_user().await?;
    payments
        .subscription_dao()
        .get_subscriptions(&uid, options)
        .await
}

/// Listen to the signed-in user's subscriptions.
///
/// The user is resolved synchronously: with nobody signed in this fails
/// before any listener is registered.
pub fn on_current_user_subscription_update<F>(
    payments: &PaymentsContext,
    on_update: F,
    on_error: Option<ErrorCallback>,
) -> Result<SubscriptionListener>
where
    F: FnMut(SubscriptionSnapshot) + Send + 'static,
{
    let uid = payments.identity().current_user_sync()?;
    payments
        .subscription_dao()
        .on_subscription_update(&uid, on_update, on_error)
}

/// Channel-based variant of [`on_current_user_subscription_update`].
pub fn current_user_subscription_feed(payments: &PaymentsContext) -> Result<SubscriptionFeed> {
    let uid = payments.identity().current_user_sync()?;
    payments.subscription_dao().subscription_feed(&uid)
}
