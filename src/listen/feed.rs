//! Channel-based access to live subscription snapshots.

use super::listener::{ErrorCallback, SubscriptionListener, UpdateCallback};
use super::snapshot::SubscriptionSnapshot;
use crate::error::{PaymentsError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

type FeedItem = Result<SubscriptionSnapshot>;

struct FeedState {
    /// `None` once the feed overflowed.
    sender: Option<Sender<FeedItem>>,
    /// Cancelled when the feed overflows.
    listener: Option<SubscriptionListener>,
}

/// Sending half shared by both callbacks.
#[derive(Clone)]
pub(crate) struct FeedSink(Arc<Mutex<FeedState>>);

/// Build a bounded channel plus the sink that fills it.
///
/// A consumer that falls `buffer_size` items behind is cut off: the
/// listener attached to the sink is cancelled and the channel disconnects
/// after the buffered items are drained.
pub(crate) fn feed_channel(buffer_size: usize) -> (FeedSink, Receiver<FeedItem>) {
    let (sender, receiver) = bounded(buffer_size);
    let sink = FeedSink(Arc::new(Mutex::new(FeedState {
        sender: Some(sender),
        listener: None,
    })));
    (sink, receiver)
}

impl FeedSink {
    pub(crate) fn callbacks(&self) -> (UpdateCallback, ErrorCallback) {
        let updates = self.clone();
        let errors = self.clone();
        let on_update: UpdateCallback =
            Box::new(move |snapshot: SubscriptionSnapshot| updates.push(Ok(snapshot)));
        let on_error: ErrorCallback = Box::new(move |error: PaymentsError| errors.push(Err(error)));
        (on_update, on_error)
    }

    /// Tie the sink to the listener feeding it.
    pub(crate) fn attach(&self, listener: &SubscriptionListener) {
        let overflowed = {
            let mut state = self.0.lock();
            if state.sender.is_some() {
                state.listener = Some(listener.clone());
            }
            state.sender.is_none()
        };
        if overflowed {
            listener.cancel();
        }
    }

    fn push(&self, item: FeedItem) {
        let listener = {
            let mut state = self.0.lock();
            let Some(sender) = state.sender.as_ref() else {
                return;
            };
            if sender.try_send(item).is_ok() {
                return;
            }
            warn!("subscription feed consumer fell behind, closing feed");
            state.sender = None;
            state.listener.take()
        };
        if let Some(listener) = listener {
            listener.cancel();
        }
    }
}

/// Live subscription snapshots delivered over a channel.
///
/// Each item is either a snapshot or the error the listener reported.
#[derive(Debug)]
pub struct SubscriptionFeed {
    listener: SubscriptionListener,
    receiver: Receiver<FeedItem>,
}

impl SubscriptionFeed {
    pub(crate) fn new(listener: SubscriptionListener, receiver: Receiver<FeedItem>) -> Self {
        Self { listener, receiver }
    }

    /// Receive the next item (blocking).
    pub fn recv(&self) -> std::result::Result<FeedItem, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an item (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<FeedItem, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> std::result::Result<FeedItem, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn listener(&self) -> &SubscriptionListener {
        &self.listener
    }

    /// Stop the underlying listener. Items already buffered stay readable.
    pub fn cancel(&self) {
        self.listener.cancel();
    }
}
