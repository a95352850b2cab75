//! Subscriber lifecycle adapter.
//!
//! Components that subscribe to the bus embed a [`Subscriptions`] set;
//! every handle it acquires is released again when the set drops, so a
//! component can never leave dangling callbacks behind. For components
//! that may be torn down while messages are still in flight,
//! [`subscribe_safe`](Subscriptions::subscribe_safe) additionally
//! guards the handler with a weak reference to the owning value: once
//! the owner is gone the handler is a no-op.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::bus::dispatch::SubscriptionHandle;
use crate::bus::MessageBus;
use crate::fixed::FixedVec;
use crate::protocol::{Alphabet, Member, MessageHeader};

/// Handles one component may hold at once.
pub const MAX_SUBSCRIPTIONS_PER_COMPONENT: usize = 16;

/// A bounded set of bus subscriptions tied to a component's lifetime.
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use ctrlbus::{payload_alphabet, MessageBus, MessageHeader, Subscriptions};
///
/// pub struct Reading(pub i32);
///
/// payload_alphabet! {
///     pub enum SensorPayload {
///         Reading(Reading),
///     }
/// }
///
/// struct Gauge {
///     total: AtomicU32,
/// }
///
/// let bus = Arc::new(
///     MessageBus::<SensorPayload>::builder()
///         .with_queue_depth(256)
///         .build()
///         .unwrap(),
/// );
/// let gauge = Arc::new(Gauge { total: AtomicU32::new(0) });
///
/// let subs = Subscriptions::new(Arc::clone(&bus));
/// subs.subscribe_safe(&gauge, |gauge: &Arc<Gauge>, r: &Reading, _h: &MessageHeader| {
///     gauge.total.fetch_add(r.0 as u32, Ordering::Relaxed);
/// });
///
/// bus.publish(Reading(5), 1);
/// bus.process_batch();
/// assert_eq!(gauge.total.load(Ordering::Relaxed), 5);
///
/// drop(subs); // unsubscribes; later messages no longer reach the gauge
/// bus.publish(Reading(7), 1);
/// bus.process_batch();
/// assert_eq!(gauge.total.load(Ordering::Relaxed), 5);
/// ```
pub struct Subscriptions<P: Alphabet> {
    bus: Arc<MessageBus<P>>,
    handles: Mutex<FixedVec<SubscriptionHandle, MAX_SUBSCRIPTIONS_PER_COMPONENT>>,
}

impl<P: Alphabet> Subscriptions<P> {
    pub fn new(bus: Arc<MessageBus<P>>) -> Self {
        Self {
            bus,
            handles: Mutex::new(FixedVec::new()),
        }
    }

    /// Subscribes a plain typed handler `(payload, header)`.
    ///
    /// Returns `false` — with no registration left behind — when either
    /// the bus's callback table or this set's handle list is full.
    pub fn subscribe_simple<T, F>(&self, callback: F) -> bool
    where
        T: Member<P>,
        F: Fn(&T, &MessageHeader) + Send + Sync + 'static,
    {
        let handle = self.bus.subscribe::<T, _>(move |envelope| {
            if let Some(data) = T::peek(&envelope.payload) {
                callback(data, &envelope.header);
            }
        });
        self.track(handle)
    }

    /// Subscribes a handler bound to `owner`: the callback receives the
    /// upgraded owner alongside the payload, and silently does nothing
    /// once the owner has been dropped — even for messages already in
    /// flight at teardown.
    pub fn subscribe_safe<S, T, F>(&self, owner: &Arc<S>, callback: F) -> bool
    where
        S: Send + Sync + 'static,
        T: Member<P>,
        F: Fn(&Arc<S>, &T, &MessageHeader) + Send + Sync + 'static,
    {
        let weak: Weak<S> = Arc::downgrade(owner);
        let handle = self.bus.subscribe::<T, _>(move |envelope| {
            let Some(owner) = weak.upgrade() else {
                return;
            };
            if let Some(data) = T::peek(&envelope.payload) {
                callback(&owner, data, &envelope.header);
            }
        });
        self.track(handle)
    }

    /// Releases every handle now instead of at drop.
    pub fn unsubscribe_all(&self) {
        let mut handles = self.handles.lock();
        let count = handles.len();
        while let Some(handle) = handles.pop() {
            self.bus.unsubscribe(handle);
        }
        if count > 0 {
            trace!(count, "component subscriptions released");
        }
    }

    /// The bus this set subscribes on.
    pub fn bus(&self) -> &Arc<MessageBus<P>> {
        &self.bus
    }

    fn track(&self, handle: SubscriptionHandle) -> bool {
        if !handle.is_valid() {
            return false;
        }
        if self.handles.lock().push(handle).is_err() {
            // Handle list full: roll the registration back so the
            // caller's `false` means "not subscribed" unambiguously.
            self.bus.unsubscribe(handle);
            return false;
        }
        true
    }
}

impl<P: Alphabet> Drop for Subscriptions<P> {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}
