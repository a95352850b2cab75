//! Tag-indexed dispatch table.
//!
//! A fixed array of `MAX_TAGS` slots, each holding a bounded list of
//! callback entries. Lookup is O(1) on the payload tag; dispatch walks
//! at most `MAX_CALLBACKS_PER_TAG` entries. Mutation is serialized by
//! the bus's writer lock; the table itself is lock-agnostic.

use crate::fixed::FixedVec;
use crate::protocol::{Alphabet, Envelope};

/// Dispatch-table width: payload alphabets may declare at most this
/// many variants.
pub const MAX_TAGS: usize = 8;

/// Bounded fan-out per payload tag.
pub const MAX_CALLBACKS_PER_TAG: usize = 16;

pub(crate) type Handler<P> = Box<dyn Fn(&Envelope<P>) + Send + Sync>;

/// Identifies one subscription. Returned by
/// [`MessageBus::subscribe`](crate::MessageBus::subscribe); opaque
/// apart from [`is_valid`](SubscriptionHandle::is_valid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub(crate) tag: usize,
    pub(crate) id: u64,
}

impl SubscriptionHandle {
    pub(crate) const REJECTED_ID: u64 = u64::MAX;

    /// `false` when the subscription was rejected because the tag's
    /// callback list was full. Invalid handles unsubscribe to `false`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.id != Self::REJECTED_ID
    }

    /// The payload tag this handle subscribes to.
    #[inline]
    pub fn tag(&self) -> usize {
        self.tag
    }
}

pub(crate) struct CallbackEntry<P> {
    id: u64,
    handler: Handler<P>,
}

pub(crate) struct DispatchSlot<P> {
    entries: FixedVec<CallbackEntry<P>, MAX_CALLBACKS_PER_TAG>,
}

pub(crate) struct DispatchTable<P> {
    slots: [DispatchSlot<P>; MAX_TAGS],
    next_id: u64,
}

impl<P: Alphabet> DispatchTable<P> {
    pub(crate) fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| DispatchSlot {
                entries: FixedVec::new(),
            }),
            next_id: 1,
        }
    }

    /// Installs `handler` under `tag` and returns its handle, or a
    /// rejected handle when the tag's entry list is full. Ids are
    /// monotonic per table and only consumed on success.
    pub(crate) fn insert(&mut self, tag: usize, handler: Handler<P>) -> SubscriptionHandle {
        debug_assert!(tag < MAX_TAGS);
        let id = self.next_id;
        let slot = &mut self.slots[tag];
        if slot.entries.push(CallbackEntry { id, handler }).is_err() {
            return SubscriptionHandle {
                tag,
                id: SubscriptionHandle::REJECTED_ID,
            };
        }
        self.next_id += 1;
        SubscriptionHandle { tag, id }
    }

    /// Removes the entry matching `handle`. Idempotent: unknown or
    /// rejected handles return `false` without touching the table.
    /// Dropping the entry releases whatever the handler captured.
    pub(crate) fn remove(&mut self, handle: SubscriptionHandle) -> bool {
        if handle.tag >= MAX_TAGS || !handle.is_valid() {
            return false;
        }
        let slot = &mut self.slots[handle.tag];
        match slot.entries.iter().position(|e| e.id == handle.id) {
            Some(index) => slot.entries.swap_remove(index).is_some(),
            None => false,
        }
    }

    /// Invokes every handler registered for the envelope's tag.
    pub(crate) fn dispatch(&self, envelope: &Envelope<P>) {
        let tag = envelope.payload.tag();
        if tag >= MAX_TAGS {
            // Alphabet wider than the table; such tags are never
            // subscribable, so the message has no receivers.
            return;
        }
        for entry in self.slots[tag].entries.iter() {
            (entry.handler)(envelope);
        }
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self, tag: usize) -> usize {
        self.slots[tag].entries.len()
    }
}
