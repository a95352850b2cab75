//! Bounded MPSC ring queue with sequenced slots.
//!
//! Each slot carries an atomic sequence counter that encodes its state
//! for the current cursor round, following the Vyukov queue design:
//!
//! * `sequence == cursor` — slot is empty, a producer at `cursor` may
//!   claim it.
//! * `sequence == cursor + 1` — slot holds a committed envelope, the
//!   consumer at `cursor` may read it.
//! * the consumer's release store sets `sequence = cursor + capacity`,
//!   which is the empty state of the next round.
//!
//! Cursors are monotonically increasing `u32`s; only the masked low bits
//! index memory and only equality against cursor-derived values matters,
//! so wraparound is benign while the capacity stays at or below 2^31.
//!
//! Producers never wait: when the target slot still belongs to a prior
//! round the publish fails and the caller sheds the message. The single
//! consumer releases each slot after dispatch, so there is no dequeue
//! contention and no consumer-side compare-exchange.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_utils::CachePadded;

use crate::fence;
use crate::protocol::Envelope;

/// Largest supported capacity; above this, cursor wraparound could
/// alias two in-flight rounds.
pub(crate) const MAX_RING_CAPACITY: u32 = 1 << 31;

/// One storage cell: sequence counter plus embedded envelope.
struct Slot<P> {
    sequence: AtomicU32,
    envelope: UnsafeCell<MaybeUninit<Envelope<P>>>,
}

/// Bounded multi-producer single-consumer ring of sequenced slots.
///
/// ### Concurrency design
///
/// * **Producers** claim a slot by compare-exchanging `producer_cursor`
///   after observing the slot's sequence equal to the cursor. The
///   envelope write is published by a release store of `sequence`.
/// * **The consumer** reads a slot once its sequence reaches
///   `cursor + 1`, dispatches, drops the envelope in place and frees
///   the slot for the next round with a release store.
/// * **`cached_consumer_cursor`** is a producer-side snapshot of the
///   consumer cursor so the admission fast path avoids an acquire load;
///   it is refreshed on the admission slow path and only ever lags the
///   real cursor.
///
/// The cursors are cache padded to keep producer and consumer traffic
/// on separate lines.
pub(crate) struct Ring<P> {
    slots: Box<[Slot<P>]>,
    mask: u32,
    producer_cursor: CachePadded<AtomicU32>,
    cached_consumer_cursor: CachePadded<AtomicU32>,
    consumer_cursor: CachePadded<AtomicU32>,
}

// Slots are handed off between threads through the sequence protocol;
// the envelope inside a slot is only touched by its current owner.
unsafe impl<P: Send> Send for Ring<P> {}
unsafe impl<P: Send> Sync for Ring<P> {}

impl<P> Ring<P> {
    /// `capacity` must be a power of two in `[2, MAX_RING_CAPACITY]`;
    /// the builder validates before calling.
    pub(crate) fn with_capacity(capacity: u32) -> Self {
        debug_assert!(capacity.is_power_of_two());
        debug_assert!(capacity >= 2 && capacity <= MAX_RING_CAPACITY);
        let slots = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicU32::new(i),
                envelope: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            mask: capacity - 1,
            producer_cursor: CachePadded::new(AtomicU32::new(0)),
            cached_consumer_cursor: CachePadded::new(AtomicU32::new(0)),
            consumer_cursor: CachePadded::new(AtomicU32::new(0)),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> u32 {
        self.mask + 1
    }

    /// Current depth from acquire loads of both cursors. Unsigned
    /// subtraction keeps the result correct across cursor wraparound.
    #[inline]
    pub(crate) fn depth(&self) -> u32 {
        let prod = self.producer_cursor.load(Ordering::Acquire);
        let cons = self.consumer_cursor.load(Ordering::Acquire);
        prod.wrapping_sub(cons)
    }

    /// Producer cursor, relaxed. Admission fast path only.
    #[inline]
    pub(crate) fn producer_pos(&self) -> u32 {
        self.producer_cursor.load(Ordering::Relaxed)
    }

    /// Cached consumer cursor, relaxed. Admission fast path only.
    #[inline]
    pub(crate) fn cached_consumer_pos(&self) -> u32 {
        self.cached_consumer_cursor.load(Ordering::Relaxed)
    }

    /// Reads the authoritative consumer cursor and refreshes the cache.
    ///
    /// Concurrent refreshes race last-writer-wins on a relaxed store;
    /// every stored value is one the real cursor actually held, so the
    /// cache can only lag behind, never run ahead.
    pub(crate) fn refresh_cached_consumer(&self) -> u32 {
        let real = self.consumer_cursor.load(fence::SLOT_ACQUIRE);
        self.cached_consumer_cursor.store(real, Ordering::Relaxed);
        real
    }

    /// Reserves a slot and, only on success, fills it with the envelope
    /// produced by `fill`.
    ///
    /// Returns `false` when the slot for the current cursor round is
    /// still occupied (queue full); the message is shed, not queued.
    /// Taking a closure lets the caller defer side effects — the bus
    /// assigns the message id inside `fill`, so failed publishes burn
    /// no ids.
    pub(crate) fn try_publish_with<F>(&self, fill: F) -> bool
    where
        F: FnOnce() -> Envelope<P>,
    {
        #[cfg(not(feature = "single-producer"))]
        let pos = {
            let mut pos = self.producer_cursor.load(Ordering::Relaxed);
            loop {
                let slot = &self.slots[(pos & self.mask) as usize];
                let seq = slot.sequence.load(fence::SLOT_ACQUIRE);
                fence::acquire_fence();
                if seq != pos {
                    // Slot still holds a prior round: full.
                    return false;
                }
                match self.producer_cursor.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    fence::CURSOR_ACQ_REL,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break pos,
                    Err(current) => pos = current,
                }
            }
        };

        #[cfg(feature = "single-producer")]
        let pos = {
            let pos = self.producer_cursor.load(Ordering::Relaxed);
            let slot = &self.slots[(pos & self.mask) as usize];
            let seq = slot.sequence.load(fence::SLOT_ACQUIRE);
            fence::acquire_fence();
            if seq != pos {
                return false;
            }
            self.producer_cursor
                .store(pos.wrapping_add(1), Ordering::Relaxed);
            pos
        };

        let slot = &self.slots[(pos & self.mask) as usize];
        // The slot is exclusively ours between the cursor claim and the
        // release store below.
        unsafe {
            (*slot.envelope.get()).write(fill());
        }
        fence::release_fence();
        slot.sequence.store(pos.wrapping_add(1), fence::SLOT_RELEASE);
        true
    }

    /// Drains up to `limit` envelopes in FIFO order, invoking
    /// `on_envelope` before each slot is released.
    ///
    /// Single consumer only. The consumer cursor is stored once at the
    /// end of the batch; producers observing slightly stale positions
    /// is what the admission slow path corrects for.
    pub(crate) fn consume_batch<F>(&self, limit: u32, mut on_envelope: F) -> u32
    where
        F: FnMut(&Envelope<P>),
    {
        let mut pos = self.consumer_cursor.load(Ordering::Relaxed);
        let mut consumed = 0u32;
        while consumed < limit {
            let slot = &self.slots[(pos & self.mask) as usize];
            let seq = slot.sequence.load(fence::SLOT_ACQUIRE);
            fence::acquire_fence();
            if seq != pos.wrapping_add(1) {
                // Next slot not committed yet: empty.
                break;
            }
            let cell = slot.envelope.get();
            // Committed by the producer's release store; exclusively
            // ours until the release store below.
            unsafe {
                on_envelope((*cell).assume_init_ref());
                (*cell).assume_init_drop();
            }
            fence::release_fence();
            slot.sequence
                .store(pos.wrapping_add(self.capacity()), fence::SLOT_RELEASE);
            pos = pos.wrapping_add(1);
            consumed += 1;
        }
        if consumed > 0 {
            self.consumer_cursor.store(pos, Ordering::Relaxed);
        }
        consumed
    }

    #[cfg(test)]
    pub(crate) fn cursors(&self) -> (u32, u32) {
        (
            self.producer_cursor.load(Ordering::Relaxed),
            self.consumer_cursor.load(Ordering::Relaxed),
        )
    }
}

impl<P> Drop for Ring<P> {
    fn drop(&mut self) {
        // Drop envelopes still in flight between the cursors.
        let mut pos = *self.consumer_cursor.get_mut();
        loop {
            let idx = (pos & self.mask) as usize;
            let slot = &mut self.slots[idx];
            if *slot.sequence.get_mut() != pos.wrapping_add(1) {
                break;
            }
            unsafe {
                slot.envelope.get_mut().assume_init_drop();
            }
            pos = pos.wrapping_add(1);
        }
    }
}
