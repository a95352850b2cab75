//! # Lock-free message bus for control and telemetry pipelines
//!
//! An in-process, bounded, **multi-producer / single-consumer** message
//! bus designed for low-latency control loops, robotics and real-time
//! simulation. Publishers submit typed payloads; one consumer drains
//! them in FIFO order and dispatches each to the subscribers registered
//! for that payload's concrete type. Under load the bus sheds traffic
//! selectively by message priority instead of blocking.
//!
//! # Features
//!
//! * **Lock-free MPSC ring** with per-slot sequence counters
//! * **Priority admission control** (HIGH / MEDIUM / LOW thresholds)
//! * **Zero heap allocation** on the publish and consume paths
//! * **Typed dispatch** by payload tag, resolved at compile time
//! * **Cache-friendly** layout (`CachePadded` cursors)
//! * Subscriber lifecycle adapter with weak-reference safety
//! * Runtime-switchable performance modes, down to bare-metal dispatch
//!
//! # Quick example
//!
//! ```
//! use ctrlbus::{payload_alphabet, MessageBus};
//!
//! pub struct MotionSample {
//!     pub x: f32,
//!     pub velocity: f32,
//! }
//!
//! payload_alphabet! {
//!     pub enum Telemetry {
//!         Motion(MotionSample),
//!     }
//! }
//!
//! let bus = MessageBus::<Telemetry>::builder()
//!     .with_queue_depth(1024)
//!     .build()
//!     .unwrap();
//!
//! let sub = bus.subscribe::<MotionSample, _>(|env| {
//!     let Telemetry::Motion(sample) = &env.payload;
//!     assert!(sample.velocity >= 0.0);
//! });
//!
//! bus.publish(MotionSample { x: 1.0, velocity: 0.5 }, 7);
//! assert_eq!(bus.process_batch(), 1);
//! bus.unsubscribe(sub);
//! ```
//!
//! # Concurrency model
//!
//! Any number of threads may publish; exactly one thread drains the bus
//! via [`MessageBus::process_batch`] or
//! [`MessageBus::process_batch_with`]. No operation blocks: publish
//! either admits or drops, consume returns zero on an empty queue.
//! Subscribe and unsubscribe may be called from any thread.

mod bus;
mod component;
mod error;
mod fence;
pub mod fixed;
mod protocol;
mod ring;

pub use bus::admission::BackpressureLevel;
pub use bus::builder::BusBuilder;
pub use bus::dispatch::{SubscriptionHandle, MAX_CALLBACKS_PER_TAG, MAX_TAGS};
pub use bus::stats::StatisticsSnapshot;
pub use bus::{MessageBus, PerformanceMode, DEFAULT_QUEUE_DEPTH, MSG_ID_WRAP_THRESHOLD};
pub use component::{Subscriptions, MAX_SUBSCRIPTIONS_PER_COMPONENT};
pub use error::{BusError, ConfigError, ErrorCallback};
pub use fixed::{FixedStr, FixedVec};
pub use protocol::{timestamp_us, Alphabet, Envelope, Member, MessageHeader, Priority};
