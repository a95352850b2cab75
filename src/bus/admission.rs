//! Priority-based admission control.
//!
//! Before every publish the gate estimates queue depth and compares it
//! against the submitting message's priority threshold. The estimate
//! uses a cached consumer position so the hot path needs no acquire
//! load; when the estimate says "drop", the slow path re-reads the
//! authoritative consumer cursor, refreshes the cache and decides on
//! the real depth. A stale cache can only overestimate depth, so
//! admission errs toward shedding, never toward overfilling.

use crate::bus::stats::BusStatistics;
use crate::protocol::Priority;
use crate::ring::Ring;

/// Observational categorization of queue fullness. Not part of the
/// admission decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BackpressureLevel {
    /// Below 75% full.
    Normal,
    /// At least 75% full.
    Warning,
    /// At least 90% full.
    Critical,
    /// At capacity.
    Full,
}

/// Depth thresholds derived once from the ring capacity.
pub(crate) struct AdmissionGate {
    low_threshold: u32,
    medium_threshold: u32,
    high_threshold: u32,
    warning_threshold: u32,
    critical_threshold: u32,
    capacity: u32,
}

impl AdmissionGate {
    pub(crate) fn new(capacity: u32) -> Self {
        let pct = |n: u32| ((capacity as u64 * n as u64) / 100) as u32;
        Self {
            low_threshold: pct(60),
            medium_threshold: pct(80),
            high_threshold: pct(99),
            warning_threshold: pct(75),
            critical_threshold: pct(90),
            capacity,
        }
    }

    #[inline]
    pub(crate) fn threshold_for(&self, priority: Priority) -> u32 {
        match priority {
            Priority::Low => self.low_threshold,
            Priority::Medium => self.medium_threshold,
            Priority::High => self.high_threshold,
        }
    }

    pub(crate) fn backpressure_level(&self, depth: u32) -> BackpressureLevel {
        if depth >= self.capacity {
            BackpressureLevel::Full
        } else if depth >= self.critical_threshold {
            BackpressureLevel::Critical
        } else if depth >= self.warning_threshold {
            BackpressureLevel::Warning
        } else {
            BackpressureLevel::Normal
        }
    }

    /// Two-stage admission check. `stats` is `None` when statistics are
    /// disabled by the current performance mode.
    pub(crate) fn admit<P>(
        &self,
        ring: &Ring<P>,
        priority: Priority,
        stats: Option<&BusStatistics>,
    ) -> bool {
        let threshold = self.threshold_for(priority);

        // Fast path: relaxed loads only. The cached consumer position
        // lags the real one, so this estimate can only be too large.
        let prod = ring.producer_pos();
        let estimated_depth = prod.wrapping_sub(ring.cached_consumer_pos());
        if estimated_depth < threshold {
            return true;
        }

        // Slow path: re-read the authoritative cursor and refresh the
        // cache so subsequent publishers benefit.
        let real = ring.refresh_cached_consumer();
        let real_depth = prod.wrapping_sub(real);
        if let Some(stats) = stats {
            stats.record_admission_recheck();
            if estimated_depth > real_depth {
                stats.record_stale_cache_delta((estimated_depth - real_depth) as u64);
            }
        }
        real_depth < threshold
    }
}
