use core::marker::PhantomData;

use tracing::debug;

use crate::bus::dispatch::MAX_TAGS;
use crate::bus::{MessageBus, DEFAULT_QUEUE_DEPTH};
use crate::error::ConfigError;
use crate::protocol::Alphabet;
use crate::ring::MAX_RING_CAPACITY;

/// Configures and constructs a [`MessageBus`].
///
/// ```
/// use ctrlbus::{payload_alphabet, MessageBus};
///
/// pub struct Tick(pub u64);
///
/// payload_alphabet! {
///     pub enum ClockPayload {
///         Tick(Tick),
///     }
/// }
///
/// let bus = MessageBus::<ClockPayload>::builder()
///     .with_queue_depth(4096)
///     .build()
///     .unwrap();
/// assert_eq!(bus.capacity(), 4096);
/// ```
pub struct BusBuilder<P> {
    queue_depth: u32,
    _payload: PhantomData<fn() -> P>,
}

impl<P: Alphabet> BusBuilder<P> {
    pub fn new() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            _payload: PhantomData,
        }
    }

    /// Ring capacity in slots. Must be a power of two in `[2, 2^31]`.
    pub fn with_queue_depth(mut self, queue_depth: u32) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    pub fn build(self) -> Result<MessageBus<P>, ConfigError> {
        if !(2..=MAX_RING_CAPACITY).contains(&self.queue_depth) {
            return Err(ConfigError::DepthOutOfRange(self.queue_depth));
        }
        if !self.queue_depth.is_power_of_two() {
            return Err(ConfigError::DepthNotPowerOfTwo(self.queue_depth));
        }
        if P::TAG_COUNT > MAX_TAGS {
            return Err(ConfigError::TooManyTags(P::TAG_COUNT, MAX_TAGS));
        }
        debug!(
            queue_depth = self.queue_depth,
            tags = P::TAG_COUNT,
            "message bus constructed"
        );
        Ok(MessageBus::with_queue_depth(self.queue_depth))
    }
}

impl<P: Alphabet> Default for BusBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload_alphabet;

    struct Unit;

    payload_alphabet! {
        enum BuilderPayload {
            Unit(Unit),
        }
    }

    #[test]
    fn rejects_non_power_of_two_depth() {
        let err = BusBuilder::<BuilderPayload>::new()
            .with_queue_depth(1000)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DepthNotPowerOfTwo(1000));
    }

    #[test]
    fn rejects_out_of_range_depth() {
        let err = BusBuilder::<BuilderPayload>::new()
            .with_queue_depth(1)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DepthOutOfRange(1));
        let err = BusBuilder::<BuilderPayload>::new()
            .with_queue_depth(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DepthOutOfRange(0));
    }

    #[test]
    fn builds_with_valid_depth() {
        let bus = BusBuilder::<BuilderPayload>::new()
            .with_queue_depth(64)
            .build()
            .unwrap();
        assert_eq!(bus.capacity(), 64);
        assert_eq!(bus.queue_depth(), 0);
    }
}
