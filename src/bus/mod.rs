//! The bus façade: ring + admission + dispatch + statistics.

pub(crate) mod admission;
pub(crate) mod builder;
pub(crate) mod dispatch;
pub(crate) mod stats;

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::atomic::AtomicCell;
use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::bus::admission::{AdmissionGate, BackpressureLevel};
use crate::bus::builder::BusBuilder;
use crate::bus::dispatch::{DispatchTable, SubscriptionHandle, MAX_TAGS};
use crate::bus::stats::{BusStatistics, StatisticsSnapshot};
use crate::error::{BusError, ErrorCallback};
use crate::protocol::{timestamp_us, Alphabet, Envelope, Member, MessageHeader, Priority};
use crate::ring::Ring;

/// Default ring capacity in slots.
pub const DEFAULT_QUEUE_DEPTH: u32 = 131_072;

/// Publishing fails once the id counter reaches this value, keeping a
/// 10 000-id margin against concurrent post-check increments. At one
/// message per nanosecond this is centuries away; the guard exists so
/// ids can never alias in a long-running deployment.
pub const MSG_ID_WRAP_THRESHOLD: u64 = u64::MAX - 10_000;

/// Upper bound of work per `process_batch` call, so the consumer can
/// interleave draining with application work.
const BATCH_PROCESS_SIZE: u32 = 1024;

/// Runtime-switchable feature level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PerformanceMode {
    /// Admission control and statistics active.
    #[default]
    FullFeatured,
    /// Admission control active, statistics updates skipped.
    NoStats,
    /// Admission and statistics skipped; ring-full is the only drop
    /// cause and dispatch bypasses the table lock. The deployment must
    /// guarantee subscribe/unsubscribe never races with dispatch in
    /// this mode.
    BareMetal,
}

/// Lock-free MPSC message bus with priority admission control.
///
/// One instance carries one payload alphabet `P`. Construct with
/// [`MessageBus::new`] or [`MessageBus::builder`], share it (typically
/// via `Arc`) between any number of publishing threads and exactly one
/// consuming thread.
///
/// Handlers run on the consumer thread and receive the envelope by
/// reference. Handlers must not panic: a panic unwinds out of
/// [`process_batch`](MessageBus::process_batch) and the message is
/// re-dispatched on the next call. Handlers may publish back into the
/// bus; recursive publishes contend on admission like any other
/// producer.
pub struct MessageBus<P: Alphabet> {
    ring: Ring<P>,
    gate: AdmissionGate,
    stats: BusStatistics,
    table: RwLock<DispatchTable<P>>,
    next_msg_id: CachePadded<AtomicU64>,
    error_callback: AtomicCell<Option<ErrorCallback>>,
    mode: AtomicCell<PerformanceMode>,
    #[cfg(debug_assertions)]
    draining: std::sync::atomic::AtomicBool,
}

impl<P: Alphabet> std::fmt::Debug for MessageBus<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus").finish_non_exhaustive()
    }
}

impl<P: Alphabet> MessageBus<P> {
    /// Creates a bus with the default queue depth.
    pub fn new() -> Self {
        Self::with_queue_depth(DEFAULT_QUEUE_DEPTH)
    }

    /// Starts configuring a bus.
    pub fn builder() -> BusBuilder<P> {
        BusBuilder::new()
    }

    /// `queue_depth` is validated by the builder (or is the default).
    pub(crate) fn with_queue_depth(queue_depth: u32) -> Self {
        debug_assert!(P::TAG_COUNT <= MAX_TAGS);
        Self {
            ring: Ring::with_capacity(queue_depth),
            gate: AdmissionGate::new(queue_depth),
            stats: BusStatistics::new(),
            table: RwLock::new(DispatchTable::new()),
            next_msg_id: CachePadded::new(AtomicU64::new(1)),
            error_callback: AtomicCell::new(None),
            mode: AtomicCell::new(PerformanceMode::FullFeatured),
            #[cfg(debug_assertions)]
            draining: std::sync::atomic::AtomicBool::new(false),
        }
    }

    // ======================== Publish ========================

    /// Publishes at MEDIUM priority with a clock-sourced timestamp.
    ///
    /// Returns `false` when the message was shed (admission denied or
    /// ring full) or the id counter is saturated. Never blocks.
    #[inline]
    pub fn publish(&self, payload: impl Into<P>, sender_id: u32) -> bool {
        self.publish_internal(payload.into(), sender_id, timestamp_us(), Priority::Medium)
    }

    /// Publishes with an explicit priority.
    #[inline]
    pub fn publish_with_priority(
        &self,
        payload: impl Into<P>,
        sender_id: u32,
        priority: Priority,
    ) -> bool {
        self.publish_internal(payload.into(), sender_id, timestamp_us(), priority)
    }

    /// Publishes at MEDIUM priority with a caller-supplied timestamp,
    /// skipping the clock read.
    #[inline]
    pub fn publish_fast(&self, payload: impl Into<P>, sender_id: u32, timestamp_us: u64) -> bool {
        self.publish_internal(payload.into(), sender_id, timestamp_us, Priority::Medium)
    }

    fn publish_internal(
        &self,
        payload: P,
        sender_id: u32,
        timestamp_us: u64,
        priority: Priority,
    ) -> bool {
        let mode = self.mode.load();
        let bare_metal = mode == PerformanceMode::BareMetal;
        let no_stats = bare_metal || mode == PerformanceMode::NoStats;

        let msg_id = self.next_msg_id.load(Ordering::Relaxed);
        if msg_id >= MSG_ID_WRAP_THRESHOLD {
            if !no_stats {
                self.stats.record_dropped(priority);
                self.report_error(BusError::OverflowDetected, msg_id);
            }
            return false;
        }

        if !bare_metal {
            let stats = (!no_stats).then_some(&self.stats);
            if !self.gate.admit(&self.ring, priority, stats) {
                if !no_stats {
                    self.stats.record_dropped(priority);
                    self.report_error(BusError::QueueFull, msg_id);
                }
                return false;
            }
        }

        let published = self.ring.try_publish_with(|| {
            // Runs only after the slot reservation succeeded, so failed
            // publishes never burn an id.
            let msg_id = self.next_msg_id.fetch_add(1, Ordering::Relaxed);
            Envelope {
                header: MessageHeader {
                    msg_id,
                    timestamp_us,
                    sender_id,
                    priority,
                },
                payload,
            }
        });

        if published {
            if !no_stats {
                self.stats.record_published(priority);
            }
        } else if !no_stats {
            self.stats.record_dropped(priority);
            self.report_error(BusError::QueueFull, msg_id);
        }
        published
    }

    // ======================== Subscribe ========================

    /// Registers `handler` for every envelope whose payload is the `T`
    /// variant. The handler runs on the consumer thread.
    ///
    /// Returns a rejected handle (see
    /// [`SubscriptionHandle::is_valid`]) when the tag already carries
    /// [`MAX_CALLBACKS_PER_TAG`](crate::MAX_CALLBACKS_PER_TAG) entries.
    pub fn subscribe<T, F>(&self, handler: F) -> SubscriptionHandle
    where
        T: Member<P>,
        F: Fn(&Envelope<P>) + Send + Sync + 'static,
    {
        const {
            assert!(
                <T as Member<P>>::TAG < MAX_TAGS,
                "variant tag exceeds the dispatch table width"
            );
        }
        let handle = self.table.write().insert(T::TAG, Box::new(handler));
        if handle.is_valid() {
            trace!(tag = handle.tag, id = handle.id, "handler subscribed");
        } else {
            warn!(tag = handle.tag, "callback slot full; subscription rejected");
        }
        handle
    }

    /// Removes a subscription. Idempotent: `false` for handles already
    /// removed, rejected at subscribe time, or out of range.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        if handle.tag >= MAX_TAGS {
            return false;
        }
        let removed = self.table.write().remove(handle);
        if removed {
            trace!(tag = handle.tag, id = handle.id, "handler unsubscribed");
        }
        removed
    }

    // ======================== Consume ========================

    /// Drains up to one batch of messages, dispatching each through the
    /// callback table, and returns how many were processed.
    ///
    /// Must only be called from the single consumer thread; debug
    /// builds enforce this with a runtime guard. Returns 0 on an empty
    /// queue. Callers drive this from their own loop, interleaving it
    /// with application work.
    pub fn process_batch(&self) -> u32 {
        let _guard = self.drain_guard();
        let mode = self.mode.load();
        let bare_metal = mode == PerformanceMode::BareMetal;
        let no_stats = bare_metal || mode == PerformanceMode::NoStats;

        let processed = if bare_metal {
            // SAFETY: BareMetal's deployment contract is that
            // subscribe/unsubscribe is quiescent while dispatching, so
            // reading the table without the lock cannot race a writer.
            let table = unsafe { &*self.table.data_ptr() };
            self.ring
                .consume_batch(BATCH_PROCESS_SIZE, |envelope| table.dispatch(envelope))
        } else {
            self.ring.consume_batch(BATCH_PROCESS_SIZE, |envelope| {
                self.table.read().dispatch(envelope)
            })
        };

        if processed > 0 && !no_stats {
            self.stats.record_processed(u64::from(processed));
        }
        processed
    }

    /// Drains up to one batch, handing each payload to `visitor`
    /// instead of the callback table: no lock, no table lookup. The
    /// recommended path for statically composed consumers, which match
    /// on the alphabet exhaustively.
    pub fn process_batch_with<F>(&self, mut visitor: F) -> u32
    where
        F: FnMut(&P),
    {
        let _guard = self.drain_guard();
        let mode = self.mode.load();
        let no_stats = mode != PerformanceMode::FullFeatured;

        let processed = self
            .ring
            .consume_batch(BATCH_PROCESS_SIZE, |envelope| visitor(&envelope.payload));

        if processed > 0 && !no_stats {
            self.stats.record_processed(u64::from(processed));
        }
        processed
    }

    // ======================== Status ========================

    /// Messages currently queued, in `[0, capacity]`.
    #[inline]
    pub fn queue_depth(&self) -> u32 {
        self.ring.depth()
    }

    /// Ring capacity in slots.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.ring.capacity()
    }

    #[inline]
    pub fn queue_utilization_percent(&self) -> u32 {
        ((u64::from(self.queue_depth()) * 100) / u64::from(self.capacity())) as u32
    }

    pub fn backpressure_level(&self) -> BackpressureLevel {
        self.gate.backpressure_level(self.queue_depth())
    }

    // ======================== Control ========================

    pub fn set_performance_mode(&self, mode: PerformanceMode) {
        self.mode.store(mode);
        debug!(?mode, "performance mode changed");
    }

    pub fn performance_mode(&self) -> PerformanceMode {
        self.mode.load()
    }

    /// Installs (or with `None`, clears) the error notification hook.
    /// The callback runs on whichever thread detected the failure and
    /// must be cheap and non-blocking.
    pub fn set_error_callback(&self, callback: Option<ErrorCallback>) {
        self.error_callback.store(callback);
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    fn report_error(&self, error: BusError, msg_id: u64) {
        if let Some(callback) = self.error_callback.load() {
            callback(error, msg_id);
        }
    }

    #[cfg(debug_assertions)]
    fn drain_guard(&self) -> DrainGuard<'_> {
        let was_draining = self.draining.swap(true, Ordering::Acquire);
        assert!(
            !was_draining,
            "process_batch called concurrently; the bus is single-consumer"
        );
        DrainGuard(&self.draining)
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn drain_guard(&self) {}

    #[cfg(test)]
    pub(crate) fn preset_next_msg_id(&self, value: u64) {
        self.next_msg_id.store(value, Ordering::Relaxed);
    }
}

impl<P: Alphabet> Default for MessageBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(debug_assertions)]
struct DrainGuard<'a>(&'a std::sync::atomic::AtomicBool);

#[cfg(debug_assertions)]
impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
