//! The sequencing and dispatch core.
//!
//! Everything in this module cooperates around one currency: the monotonic
//! [`Sequence`]. Producers claim sequences from a [`Sequencer`], write the
//! corresponding ring-buffer slots, and publish; consumers wait on a
//! [`SequenceBarrier`] and drain batches through a [`BatchEventProcessor`].

pub mod core_interfaces;
#[allow(clippy::module_inception)]
pub mod disruptor;
pub mod event_factory;
pub mod event_handler;
pub mod event_processor;
pub mod event_translator;
pub mod exception_handler;
pub mod producer_type;
pub mod ring_buffer;
pub mod sequence;
pub mod sequence_barrier;
pub mod sequencer;
pub mod thread_management;
pub mod wait_strategy;

#[cfg(test)]
mod property_tests;

pub use core_interfaces::{Cursored, DataProvider, EventSink, Sequenced};
pub use disruptor::{Disruptor, DisruptorBuilder};
pub use event_factory::{event_factory, ClosureEventFactory, DefaultEventFactory, EventFactory};
pub use event_handler::{ClosureEventHandler, EventHandler, NoOpEventHandler};
pub use event_processor::{BatchEventProcessor, EventProcessor};
pub use event_translator::{
    event_translator, event_translator_one_arg, event_translator_two_arg, ClosureEventTranslator,
    EventTranslator, EventTranslatorOneArg, EventTranslatorThreeArg, EventTranslatorTwoArg,
};
pub use exception_handler::{
    ClosureExceptionHandler, DefaultExceptionHandler, ExceptionHandler, IgnoreExceptionHandler,
    PanicExceptionHandler,
};
pub use producer_type::ProducerType;
pub use ring_buffer::RingBuffer;
pub use sequence::Sequence;
pub use sequence_barrier::{ProcessingSequenceBarrier, SequenceBarrier};
pub use sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
pub use thread_management::{ManagedThread, ThreadBuilder, ThreadContext};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy, TimeoutBlockingWaitStrategy,
    WaitStrategy, YieldingWaitStrategy,
};

/// The value every sequence starts from: one before the first real sequence.
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Errors surfaced by the disruptor core.
#[derive(Debug, thiserror::Error)]
pub enum DisruptorError {
    /// Buffer sizes must be a non-zero power of two so that sequence-to-slot
    /// mapping stays a mask operation.
    #[error("buffer size must be a power of 2, got {0}")]
    InvalidBufferSize(usize),

    /// Batch claims must cover at least one sequence and at most the whole
    /// ring.
    #[error("batch size out of range: {0}")]
    InvalidBatchSize(i64),

    /// A non-blocking claim would have overtaken the slowest gating
    /// sequence. Carries no payload so call sites can discriminate on it
    /// without allocating.
    #[error("insufficient capacity in ring buffer")]
    InsufficientCapacity,

    /// The barrier was alerted while waiting; cooperative shutdown signal.
    #[error("sequence barrier alerted")]
    Alert,

    /// A timeout-capable wait strategy gave up before the requested sequence
    /// became available.
    #[error("timed out waiting for sequence")]
    Timeout,

    /// `run()` was invoked on a processor that is already running.
    #[error("event processor already running")]
    AlreadyRunning,

    /// A user event handler failed. Routed to the exception handler by the
    /// processor; never propagated out of the processing loop.
    #[error("event handler failed: {0}")]
    Handler(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<Box<dyn std::error::Error + Send + Sync + 'static>> for DisruptorError {
    fn from(error: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        Self::Handler(error)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DisruptorError>;

/// Check whether `n` is a power of two. Zero is not.
#[must_use]
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}
