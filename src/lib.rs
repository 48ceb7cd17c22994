//! # Billing Subscriptions
//!
//! Read-only access to a signed-in user's billing subscriptions kept in a
//! document store, with one-shot fetches and live snapshot updates.
//!
//! ## Core Concepts
//!
//! - **Documents**: Subscriptions live at `{customers}/{uid}/subscriptions/{id}`
//!   and are written out-of-band (e.g. by a payment-provider webhook)
//! - **Converter**: Maps each stored document into a [`Subscription`]
//! - **DAO**: Fetches one or many subscriptions and registers live listeners
//! - **Snapshots**: Every listener delivery becomes a complete, ordered
//!   [`SubscriptionSnapshot`] plus its change-log
//!
//! ## Example
//!
//! ```ignore
//! use billing_subscriptions::{
//!     api, MemoryStore, PaymentsConfig, PaymentsContext, SessionIdentity,
//!     SubscriptionQueryOptions, SubscriptionStatus,
//! };
//!
//! let payments = PaymentsContext::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(SessionIdentity::signed_in("alice")),
//!     PaymentsConfig::default(),
//! )?;
//!
//! // One-shot query
//! let active = api::get_current_user_subscriptions(
//!     &payments,
//!     &SubscriptionQueryOptions::with_status(SubscriptionStatus::Active),
//! )
//! .await?;
//!
//! // Live updates
//! let listener = api::on_current_user_subscription_update(
//!     &payments,
//!     |snapshot| println!("{} subscriptions", snapshot.size),
//!     None,
//! )?;
//! listener.cancel();
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod converter;
pub mod dao;
pub mod document;
pub mod error;
pub mod listen;
pub mod query;
pub mod types;

// Re-exports
pub use auth::{IdentityResolver, SessionIdentity};
pub use config::PaymentsConfig;
pub use context::{ComponentKey, ComponentRegistry, PaymentsContext, SUBSCRIPTION_DAO};
pub use converter::{to_utc_string, DocumentConverter, SubscriptionConverter};
pub use dao::SubscriptionDao;
pub use document::{
    ChangeType, Document, DocumentChange, DocumentPath, DocumentStore, FieldFilter, FieldValue,
    FilterOp, ListenEvent, ListenRegistration, ListenerId, MemoryStore, Query, QuerySnapshot,
};
pub use error::{ConversionError, DocumentStoreError, ErrorKind, PaymentsError, Result};
pub use listen::{
    reconcile, ErrorCallback, SubscriptionChange, SubscriptionFeed, SubscriptionListener,
    SubscriptionSnapshot, UpdateCallback,
};
pub use query::{subscriptions_query, StatusFilter, SubscriptionQueryOptions};
pub use types::*;
