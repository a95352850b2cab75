//! Bus statistics: independent relaxed atomics, skew between counters
//! is acceptable for observability.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::protocol::Priority;

pub(crate) struct BusStatistics {
    messages_published: AtomicU64,
    messages_dropped: AtomicU64,
    messages_processed: AtomicU64,
    processing_errors: AtomicU64,
    published_by_priority: [AtomicU64; Priority::COUNT],
    dropped_by_priority: [AtomicU64; Priority::COUNT],
    admission_rechecks: AtomicU64,
    stale_cache_depth_delta: AtomicU64,
}

impl BusStatistics {
    pub(crate) fn new() -> Self {
        Self {
            messages_published: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            messages_processed: AtomicU64::new(0),
            processing_errors: AtomicU64::new(0),
            published_by_priority: [const { AtomicU64::new(0) }; Priority::COUNT],
            dropped_by_priority: [const { AtomicU64::new(0) }; Priority::COUNT],
            admission_rechecks: AtomicU64::new(0),
            stale_cache_depth_delta: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_published(&self, priority: Priority) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        self.published_by_priority[priority.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self, priority: Priority) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
        self.dropped_by_priority[priority.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_processed(&self, count: u64) {
        self.messages_processed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_admission_recheck(&self) {
        self.admission_rechecks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_stale_cache_delta(&self, delta: u64) {
        self.stale_cache_depth_delta.fetch_add(delta, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            processing_errors: self.processing_errors.load(Ordering::Relaxed),
            published_by_priority: self
                .published_by_priority
                .each_ref()
                .map(|c| c.load(Ordering::Relaxed)),
            dropped_by_priority: self
                .dropped_by_priority
                .each_ref()
                .map(|c| c.load(Ordering::Relaxed)),
            admission_rechecks: self.admission_rechecks.load(Ordering::Relaxed),
            stale_cache_depth_delta: self.stale_cache_depth_delta.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.messages_published.store(0, Ordering::Relaxed);
        self.messages_dropped.store(0, Ordering::Relaxed);
        self.messages_processed.store(0, Ordering::Relaxed);
        self.processing_errors.store(0, Ordering::Relaxed);
        for counter in &self.published_by_priority {
            counter.store(0, Ordering::Relaxed);
        }
        for counter in &self.dropped_by_priority {
            counter.store(0, Ordering::Relaxed);
        }
        self.admission_rechecks.store(0, Ordering::Relaxed);
        self.stale_cache_depth_delta.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the bus counters.
///
/// Counters are read independently with relaxed ordering, so a snapshot
/// taken while producers run may show small skew between fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub messages_published: u64,
    pub messages_dropped: u64,
    pub messages_processed: u64,
    pub processing_errors: u64,
    pub published_by_priority: [u64; Priority::COUNT],
    pub dropped_by_priority: [u64; Priority::COUNT],
    pub admission_rechecks: u64,
    pub stale_cache_depth_delta: u64,
}

impl StatisticsSnapshot {
    /// Messages published at `priority`.
    #[inline]
    pub fn published(&self, priority: Priority) -> u64 {
        self.published_by_priority[priority.index()]
    }

    /// Messages dropped at `priority`.
    #[inline]
    pub fn dropped(&self, priority: Priority) -> u64 {
        self.dropped_by_priority[priority.index()]
    }
}
