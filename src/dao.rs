//! Subscription data access over a document store.

use crate::config::PaymentsConfig;
use crate::converter::{DocumentConverter, SubscriptionConverter};
use crate::document::{Document, DocumentStore};
use crate::error::{PaymentsError, Result};
use crate::listen::{
    feed_channel, ErrorCallback, SubscriptionFeed, SubscriptionListener, SubscriptionSnapshot,
    UpdateCallback,
};
use crate::query::{
    check_segment, subscriptions_collection, subscriptions_query, StatusFilter,
    SubscriptionQueryOptions,
};
use crate::types::Subscription;
use std::sync::Arc;
use tracing::debug;

/// Read-only access to the subscriptions stored under each customer.
///
/// Store failures are reported as [`PaymentsError::Internal`] with the
/// original error as the source. A missing subscription is
/// [`PaymentsError::NotFound`].
pub struct SubscriptionDao {
    store: Arc<dyn DocumentStore>,
    customers_collection: String,
    buffer_size: usize,
    converter: SubscriptionConverter,
}

impl SubscriptionDao {
    pub fn new(store: Arc<dyn DocumentStore>, config: &PaymentsConfig) -> Self {
        Self {
            store,
            customers_collection: config.customers_collection.clone(),
            buffer_size: config.listener_buffer_size,
            converter: SubscriptionConverter,
        }
    }

    /// Fetch one subscription of a user.
    pub async fn get_subscription(&self, uid: &str, subscription_id: &str) -> Result<Subscription> {
        check_segment("subscription id", subscription_id)?;
        let path = subscriptions_collection(&self.customers_collection, uid)?
            .child(subscription_id)
            .map_err(|e| PaymentsError::InvalidArgument(e.to_string()))?;

        let document = self.store.get_document(&path).await.map_err(|e| {
            PaymentsError::internal(
                format!("failed to fetch subscription {subscription_id} for user {uid}"),
                e,
            )
        })?;

        let Some(document) = document else {
            return Err(PaymentsError::NotFound(format!(
                "No subscription found with the ID: {subscription_id} for user: {uid}"
            )));
        };

        debug!(uid, subscription_id, "fetched subscription");
        self.convert(&document)
    }

    /// Fetch a user's subscriptions in store order, optionally filtered by
    /// status. No match yields an empty list.
    pub async fn get_subscriptions(
        &self,
        uid: &str,
        options: &SubscriptionQueryOptions,
    ) -> Result<Vec<Subscription>> {
        let statuses = options
            .status
            .as_ref()
            .map(StatusFilter::to_set)
            .transpose()?;
        let query = subscriptions_query(&self.customers_collection, uid, statuses.as_deref())?;

        let documents = self.store.run_query(&query).await.map_err(|e| {
            PaymentsError::internal(format!("failed to query subscriptions for user {uid}"), e)
        })?;

        debug!(uid, count = documents.len(), "fetched subscriptions");
        documents.iter().map(|doc| self.convert(doc)).collect()
    }

    /// Listen to every subscription of a user.
    ///
    /// The listener is registered before this returns. `on_update` runs once
    /// per store delivery, starting with the complete current state. Faults
    /// go to `on_error` and do not stop the listener.
    pub fn on_subscription_update<F>(
        &self,
        uid: &str,
        on_update: F,
        on_error: Option<ErrorCallback>,
    ) -> Result<SubscriptionListener>
    where
        F: FnMut(SubscriptionSnapshot) + Send + 'static,
    {
        self.listen(uid, Box::new(on_update), on_error)
    }

    /// Like [`on_subscription_update`], delivering into a channel.
    ///
    /// [`on_subscription_update`]: SubscriptionDao::on_subscription_update
    pub fn subscription_feed(&self, uid: &str) -> Result<SubscriptionFeed> {
        let (sink, receiver) = feed_channel(self.buffer_size);
        let (on_update, on_error) = sink.callbacks();
        let listener = self.listen(uid, on_update, Some(on_error))?;
        sink.attach(&listener);
        Ok(SubscriptionFeed::new(listener, receiver))
    }

    fn listen(
        &self,
        uid: &str,
        on_update: UpdateCallback,
        on_error: Option<ErrorCallback>,
    ) -> Result<SubscriptionListener> {
        let query = subscriptions_query(&self.customers_collection, uid, None)?;
        let registration = self.store.listen(&query).map_err(|e| {
            PaymentsError::internal(format!("failed to listen to subscriptions for user {uid}"), e)
        })?;

        debug!(uid, listener = registration.id.0, "listening to subscriptions");
        SubscriptionListener::start(
            Arc::clone(&self.store),
            query,
            registration,
            on_update,
            on_error,
        )
    }

    fn convert(&self, document: &Document) -> Result<Subscription> {
        self.converter.from_storage(document).map_err(|e| {
            PaymentsError::internal(format!("failed to read subscription {}", document.path), e)
        })
    }
}

impl std::fmt::Debug for SubscriptionDao {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionDao")
            .field("customers_collection", &self.customers_collection)
            .finish()
    }
}
