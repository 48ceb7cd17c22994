//! Live subscription listeners.

use super::snapshot::{reconcile, SubscriptionSnapshot};
use crate::converter::SubscriptionConverter;
use crate::document::{DocumentStore, ListenEvent, ListenRegistration, ListenerId, Query};
use crate::error::{DocumentStoreError, PaymentsError, Result};
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use parking_lot::ReentrantMutex;
use std::cell::Cell;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Callback receiving every snapshot.
pub type UpdateCallback = Box<dyn FnMut(SubscriptionSnapshot) + Send>;

/// Callback receiving listener faults.
pub type ErrorCallback = Box<dyn FnMut(PaymentsError) + Send>;

/// Listener state shared by the handle and its forwarding thread.
struct ListenState {
    /// `false` once the listener is cancelled or can no longer be restored.
    active: Cell<bool>,
    /// Current store registration; changes when the listener is restored.
    id: Cell<ListenerId>,
}

/// Held while a callback runs.
///
/// Reentrant so a callback may cancel its own listener.
type DeliveryGuard = Arc<ReentrantMutex<ListenState>>;

/// Handle to a running subscription listener.
///
/// Dropping the handle does **not** stop the listener. Call [`cancel()`] to
/// stop delivery and release the store listener.
///
/// If the store drops the listener (for example because it fell behind),
/// the fault is reported through `on_error` and the listener registers
/// again; the next snapshot carries the complete current state. Only when
/// that registration fails does the listener stop by itself, after which
/// [`is_active()`] returns `false`.
///
/// [`cancel()`]: SubscriptionListener::cancel
/// [`is_active()`]: SubscriptionListener::is_active
#[derive(Clone)]
pub struct SubscriptionListener {
    store: Arc<dyn DocumentStore>,
    state: DeliveryGuard,
    stop: Sender<()>,
}

impl SubscriptionListener {
    /// Start forwarding store events for a registered listener.
    pub(crate) fn start(
        store: Arc<dyn DocumentStore>,
        query: Query,
        registration: ListenRegistration,
        on_update: UpdateCallback,
        on_error: Option<ErrorCallback>,
    ) -> Result<Self> {
        let ListenRegistration { id, events } = registration;
        let state: DeliveryGuard = Arc::new(ReentrantMutex::new(ListenState {
            active: Cell::new(true),
            id: Cell::new(id),
        }));
        let (stop, stop_rx) = bounded(1);

        let forwarder = Forwarder {
            store: Arc::clone(&store),
            query,
            events,
            stop: stop_rx,
            state: Arc::clone(&state),
            on_update,
            on_error,
        };

        let spawned = thread::Builder::new()
            .name(format!("subscription-listener-{}", id.0))
            .spawn(move || forwarder.run());
        if let Err(e) = spawned {
            store.unlisten(id);
            return Err(PaymentsError::internal("failed to start subscription listener", e));
        }

        debug!(listener = id.0, "subscription listener started");
        Ok(Self { store, state, stop })
    }

    /// Current store registration.
    pub fn id(&self) -> ListenerId {
        self.state.lock().id.get()
    }

    /// Whether the listener still delivers callbacks.
    pub fn is_active(&self) -> bool {
        self.state.lock().active.get()
    }

    /// Stop delivery and release the store listener.
    ///
    /// Idempotent. Once this returns no callback will start, though one
    /// already running on another thread finishes first.
    pub fn cancel(&self) {
        let id = {
            let state = self.state.lock();
            if !state.active.replace(false) {
                return;
            }
            state.id.get()
        };
        let _ = self.stop.try_send(());
        self.store.unlisten(id);
        debug!(listener = id.0, "subscription listener cancelled");
    }
}

impl std::fmt::Debug for SubscriptionListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionListener")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

enum Wake {
    /// `false` if the stop channel disconnected.
    Stop(bool),
    Event(std::result::Result<ListenEvent, crossbeam_channel::RecvError>),
}

/// Background half of a listener: reconciles store events into snapshots.
struct Forwarder {
    store: Arc<dyn DocumentStore>,
    query: Query,
    events: Receiver<ListenEvent>,
    stop: Receiver<()>,
    state: DeliveryGuard,
    on_update: UpdateCallback,
    on_error: Option<ErrorCallback>,
}

impl Forwarder {
    fn run(mut self) {
        let converter = SubscriptionConverter;
        let mut stop = self.stop.clone();

        loop {
            let wake = select! {
                recv(stop) -> signal => Wake::Stop(signal.is_ok()),
                recv(self.events) -> event => Wake::Event(event),
            };
            let event = match wake {
                Wake::Stop(true) => break,
                // All handles dropped without cancelling; keep delivering.
                Wake::Stop(false) => {
                    stop = never();
                    continue;
                }
                Wake::Event(event) => event,
            };

            let outcome = match event {
                Ok(Ok(snapshot)) => reconcile(&converter, &snapshot).map_err(|e| {
                    PaymentsError::internal("failed to convert subscription snapshot", e)
                }),
                Ok(Err(e)) => Err(PaymentsError::internal("subscription listener failed", e)),
                Err(_) => {
                    if !self.restore() {
                        break;
                    }
                    continue;
                }
            };

            if !self.deliver(outcome) {
                break;
            }
        }
    }

    /// Invoke the matching callback. Returns false once cancelled.
    fn deliver(&mut self, outcome: Result<SubscriptionSnapshot>) -> bool {
        let state = self.state.lock();
        if !state.active.get() {
            return false;
        }

        match outcome {
            Ok(snapshot) => (self.on_update)(snapshot),
            Err(e) => {
                warn!(error = %e, "subscription listener error");
                if let Some(on_error) = self.on_error.as_mut() {
                    on_error(e);
                }
            }
        }
        true
    }

    /// Register again after the store closed the event channel.
    ///
    /// Returns false if the listener was cancelled or cannot be restored.
    fn restore(&mut self) -> bool {
        let shared = Arc::clone(&self.state);
        let state = shared.lock();
        if !state.active.get() {
            return false;
        }

        let dropped = state.id.get();
        warn!(listener = dropped.0, "subscription listener closed by the store");
        let delivered = self.deliver(Err(PaymentsError::internal(
            "subscription listener closed by the store",
            DocumentStoreError::ListenerDropped,
        )));
        // The error callback may have cancelled.
        if !delivered || !state.active.get() {
            return false;
        }

        match self.store.listen(&self.query) {
            Ok(ListenRegistration { id, events }) => {
                debug!(dropped = dropped.0, listener = id.0, "subscription listener restored");
                state.id.set(id);
                self.events = events;
                true
            }
            Err(e) => {
                self.deliver(Err(PaymentsError::internal(
                    "failed to restore subscription listener",
                    e,
                )));
                state.active.set(false);
                false
            }
        }
    }
}
