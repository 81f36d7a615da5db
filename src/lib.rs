//! `ringbus`: high-throughput, low-latency inter-thread messaging.
//!
//! An implementation of the LMAX Disruptor pattern: ordered event delivery
//! from one or more producer threads to one or more consumer threads over a
//! preallocated ring buffer, coordinated entirely by sequence counters.
//!
//! ## Properties
//!
//! - **No locks on contended paths**: producers claim slots with CAS (or
//!   nothing at all in single-producer mode); consumers gate on sequences.
//! - **No allocation on the hot path**: every slot is constructed once, up
//!   front, and mutated in place afterwards.
//! - **Bounded backpressure**: a producer can never lap the slowest
//!   consumer; when the ring is full it waits (or reports
//!   insufficient capacity from the `try_` variants).
//! - **Batching**: consumers drain every available event per wakeup,
//!   amortising cross-thread synchronisation.
//!
//! ## Quick start
//!
//! ```
//! use ringbus::disruptor::{
//!     event_translator, ClosureEventHandler, DefaultEventFactory, Disruptor, Result,
//! };
//!
//! #[derive(Debug, Default)]
//! struct Tick {
//!     value: i64,
//! }
//!
//! let factory = DefaultEventFactory::<Tick>::new();
//! let mut disruptor = Disruptor::with_defaults(&factory, 1024)
//!     .unwrap()
//!     .handle_events_with(ClosureEventHandler::new(
//!         |tick: &mut Tick, sequence, _end_of_batch| -> Result<()> {
//!             assert_eq!(tick.value, sequence);
//!             Ok(())
//!         },
//!     ))
//!     .build();
//!
//! disruptor.start().unwrap();
//!
//! let translator = event_translator(|tick: &mut Tick, sequence| tick.value = sequence);
//! for _ in 0..100 {
//!     disruptor.publish_event(&translator).unwrap();
//! }
//!
//! disruptor.shutdown();
//! ```
//!
//! ## Architecture
//!
//! - [`disruptor::Sequence`]: padded atomic counter, the unit of
//!   coordination.
//! - [`disruptor::Sequencer`]: claims and publishes sequence ranges
//!   (single- and multi-producer variants).
//! - [`disruptor::RingBuffer`]: the preallocated slot array; producer
//!   handle and data provider in one.
//! - [`disruptor::SequenceBarrier`]: what a consumer waits on; encodes its
//!   dependencies and carries the shutdown alert.
//! - [`disruptor::WaitStrategy`]: how waiting consumers burn or yield CPU.
//! - [`disruptor::BatchEventProcessor`]: the consumer loop driving an
//!   [`disruptor::EventHandler`].
//! - [`disruptor::Disruptor`]: the wiring DSL tying the above together.

pub mod disruptor;

pub use disruptor::{
    is_power_of_two, BatchEventProcessor, BlockingWaitStrategy, BusySpinWaitStrategy,
    DefaultEventFactory, Disruptor, DisruptorError, EventFactory, EventHandler, EventProcessor,
    EventTranslator, EventTranslatorOneArg, EventTranslatorThreeArg, EventTranslatorTwoArg,
    ExceptionHandler, MultiProducerSequencer, ProducerType, Result, RingBuffer, Sequence,
    SequenceBarrier, Sequencer, SingleProducerSequencer, SleepingWaitStrategy,
    TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy, INITIAL_CURSOR_VALUE,
};

/// Crate version as compiled.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The version of the `ringbus` library.
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
