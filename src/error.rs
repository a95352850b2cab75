use thiserror::Error;

/// Runtime bus error taxonomy, reported through the optional error
/// callback. The bus itself never panics and never returns these as
/// `Result`s: publish reports failure as `false` plus a callback
/// invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum BusError {
    /// Admission denied for the message's priority, or the ring had no
    /// free slot for the current cursor round.
    #[error("queue full")]
    QueueFull,
    /// Reserved for user extensions; never emitted by the bus.
    #[error("invalid message")]
    InvalidMessage,
    /// Reserved for handler-side failures wrapped by user code; the bus
    /// does not intercept handler behavior.
    #[error("processing error")]
    ProcessingError,
    /// The message-id counter is within 10 000 of saturation; every
    /// publish is refused until the bus is rebuilt.
    #[error("message id counter near saturation")]
    OverflowDetected,
}

/// Error notification hook: `(error, msg_id)`.
///
/// A plain function pointer so it can live in an atomic cell and be
/// swapped at runtime without locking. The id is the one the failed
/// publish would have consumed.
pub type ErrorCallback = fn(BusError, u64);

/// Configuration rejected by [`BusBuilder::build`](crate::BusBuilder::build).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("queue depth must be a power of two, got {0}")]
    DepthNotPowerOfTwo(u32),
    #[error("queue depth {0} outside the supported range [2, 2^31]")]
    DepthOutOfRange(u32),
    #[error("payload alphabet declares {0} tags but the dispatch table holds {1}")]
    TooManyTags(usize, usize),
}
