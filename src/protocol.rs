//! Transport protocol types: priority, header, envelope and the payload
//! alphabet traits.
//!
//! A bus instance carries exactly one *payload alphabet* — a closed enum
//! of the message types that may travel on it. Each variant has a stable
//! tag index assigned in declaration order; the dispatch table is keyed
//! by that index. The [`payload_alphabet!`] macro generates the enum and
//! all trait plumbing.

use std::sync::OnceLock;
use std::time::Instant;

/// Message priority levels for admission control.
///
/// Priority drives only admission (which messages are shed under load),
/// never delivery order: the queue stays strictly FIFO.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Dropped once the queue is 60% full.
    Low = 0,
    /// Dropped once the queue is 80% full.
    #[default]
    Medium = 1,
    /// Dropped only once the queue is 99% full.
    High = 2,
}

impl Priority {
    /// Number of priority levels, for per-priority counter arrays.
    pub(crate) const COUNT: usize = 3;

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Per-message metadata assigned by the bus at publish time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// Globally incremental id, starting at 1, never reused.
    pub msg_id: u64,
    /// Microsecond timestamp from [`timestamp_us`], or caller-supplied.
    pub timestamp_us: u64,
    /// Caller-chosen sender identifier.
    pub sender_id: u32,
    /// Priority the message was admitted under.
    pub priority: Priority,
}

/// The unit of transport: header plus payload, embedded by value in the
/// ring buffer. No owning pointers; moving an envelope moves the payload.
#[derive(Clone, Debug)]
pub struct Envelope<P> {
    pub header: MessageHeader,
    pub payload: P,
}

/// A closed payload alphabet.
///
/// Implemented by the user's payload enum, normally through the
/// [`payload_alphabet!`] macro. `TAG_COUNT` must not exceed
/// [`MAX_TAGS`](crate::MAX_TAGS) for all variants to be dispatchable.
pub trait Alphabet: Send + 'static {
    /// Number of variants in the alphabet.
    const TAG_COUNT: usize;

    /// The tag index of this value, in `[0, TAG_COUNT)`.
    fn tag(&self) -> usize;
}

/// Connects a variant type `T` to its position inside an alphabet `P`.
///
/// Generated by [`payload_alphabet!`]; lets `subscribe::<T, _>` resolve
/// the dispatch-table index at compile time.
pub trait Member<P: Alphabet>: Sized {
    /// Compile-time tag index of this variant within `P`.
    const TAG: usize;

    /// Borrow the variant out of a payload when the tags match.
    fn peek(payload: &P) -> Option<&Self>;
}

/// Declares a payload alphabet enum and wires up [`Alphabet`],
/// [`Member`] and `From` impls for every variant.
///
/// Tags are assigned in declaration order, starting at 0.
///
/// ```
/// pub struct SensorData { pub temperature: f32 }
/// pub struct MotorCommand { pub speed: i32 }
///
/// ctrlbus::payload_alphabet! {
///     pub enum RobotPayload {
///         Sensor(SensorData),
///         Motor(MotorCommand),
///     }
/// }
///
/// use ctrlbus::{Alphabet, Member};
/// assert_eq!(<SensorData as Member<RobotPayload>>::TAG, 0);
/// assert_eq!(RobotPayload::Motor(MotorCommand { speed: 3 }).tag(), 1);
/// ```
#[macro_export]
macro_rules! payload_alphabet {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident($ty:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant($ty),)+
        }

        impl $crate::Alphabet for $name {
            const TAG_COUNT: usize = $crate::payload_alphabet!(@count $($variant)+);

            fn tag(&self) -> usize {
                match self {
                    $(Self::$variant(_) => <$ty as $crate::Member<Self>>::TAG,)+
                }
            }
        }

        $crate::payload_alphabet!(@members $name; 0usize; $($variant => $ty;)+);

        $(
            impl ::core::convert::From<$ty> for $name {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };

    (@count) => { 0usize };
    (@count $head:ident $($rest:ident)*) => {
        1usize + $crate::payload_alphabet!(@count $($rest)*)
    };

    (@members $name:ident; $idx:expr;) => {};
    (@members $name:ident; $idx:expr; $variant:ident => $ty:ty; $($rv:ident => $rt:ty;)*) => {
        impl $crate::Member<$name> for $ty {
            const TAG: usize = $idx;

            // The `_` arm is only reachable for multi-variant alphabets.
            #[allow(unreachable_patterns)]
            fn peek(payload: &$name) -> ::core::option::Option<&Self> {
                match payload {
                    $name::$variant(value) => ::core::option::Option::Some(value),
                    _ => ::core::option::Option::None,
                }
            }
        }

        $crate::payload_alphabet!(@members $name; $idx + 1usize; $($rv => $rt;)*);
    };
}

/// Microseconds from a steady monotonic clock.
///
/// The epoch is the first call in the process, so values are comparable
/// within a process only. Used for default publish timestamps; callers
/// of `publish_fast` may source their timestamps here too.
#[inline]
pub fn timestamp_us() -> u64 {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    ANCHOR.get_or_init(Instant::now).elapsed().as_micros() as u64
}
