//! Memory-model selection for the ring's sequence protocol.
//!
//! On SMP targets the slot hand-off uses hardware acquire/release
//! ordering. The `single-core` feature degrades those orderings to
//! relaxed and pairs every hand-off with a compiler-only fence, which
//! is sufficient on single-core MCU-class targets where the only
//! reordering hazard is the compiler itself.

use core::sync::atomic::Ordering;

// `single-core` removes hardware memory barriers from the publish and
// consume paths. That is only sound when producer and consumer can
// never run on different cores (Cortex-M class MCUs, single-core
// RTOS). Enabling it on an SMP machine silently corrupts the queue,
// so the opt-in must be acknowledged explicitly.
#[cfg(all(feature = "single-core", not(feature = "single-core-ack")))]
compile_error!(
    "the `single-core` feature replaces hardware memory barriers with compiler-only fences, \
     which is only safe on single-core targets. Enable the `single-core-ack` feature as well \
     to confirm the deployment is single-core."
);

/// Ordering for loads of a slot's sequence counter.
pub(crate) const SLOT_ACQUIRE: Ordering = if cfg!(feature = "single-core") {
    Ordering::Relaxed
} else {
    Ordering::Acquire
};

/// Ordering for stores of a slot's sequence counter.
pub(crate) const SLOT_RELEASE: Ordering = if cfg!(feature = "single-core") {
    Ordering::Relaxed
} else {
    Ordering::Release
};

/// Success ordering for the producer-cursor compare-exchange.
#[cfg(not(feature = "single-producer"))]
pub(crate) const CURSOR_ACQ_REL: Ordering = if cfg!(feature = "single-core") {
    Ordering::Relaxed
} else {
    Ordering::AcqRel
};

#[inline(always)]
pub(crate) fn acquire_fence() {
    #[cfg(feature = "single-core")]
    core::sync::atomic::compiler_fence(Ordering::Acquire);
}

#[inline(always)]
pub(crate) fn release_fence() {
    #[cfg(feature = "single-core")]
    core::sync::atomic::compiler_fence(Ordering::Release);
}
