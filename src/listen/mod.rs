//! Live subscription updates.
//!
//! A listener turns every store delivery into a complete
//! [`SubscriptionSnapshot`]:
//! - The full current list, recomputed from the store's result set
//! - The change-log since the previous delivery
//!
//! Deliveries for one listener never overlap and arrive in the order the
//! underlying changes happened.
//!
//! # Example
//!
//! ```ignore
//! let listener = dao.on_subscription_update(
//!     "alice",
//!     |snapshot| println!("{} subscriptions", snapshot.size),
//!     None,
//! )?;
//!
//! // Later
//! listener.cancel();
//! ```

mod feed;
mod listener;
mod snapshot;

pub(crate) use feed::feed_channel;
pub use feed::SubscriptionFeed;
pub use listener::{ErrorCallback, SubscriptionListener, UpdateCallback};
pub use snapshot::{reconcile, SubscriptionChange, SubscriptionSnapshot};
