//! Exception handlers: isolating the processing loop from handler faults.
//!
//! Without one, a single bad event would kill the consumer thread and stall
//! the whole pipeline behind its gating sequence. The default implementation
//! logs and swallows; processors never rethrow out of the loop.

use std::fmt::Debug;

use crate::disruptor::DisruptorError;

/// Receiver for faults raised by an event handler.
///
/// `event` is `None` when there is no event in hand, e.g. a fault from the
/// timeout notification hook.
pub trait ExceptionHandler<T>: Send + Sync {
    /// A fault from `on_event` or `on_batch_start`; `sequence` is the
    /// sequence the processor will skip.
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>);

    /// A fault from the lifecycle start notification.
    fn handle_on_start_exception(&self, error: DisruptorError);

    /// A fault from the lifecycle shutdown notification.
    fn handle_on_shutdown_exception(&self, error: DisruptorError);
}

/// Logs every fault through `tracing` and never rethrows.
#[derive(Debug, Default)]
pub struct DefaultExceptionHandler<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> DefaultExceptionHandler<T> {
    /// Create the logging handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> ExceptionHandler<T> for DefaultExceptionHandler<T>
where
    T: Debug + Send + Sync,
{
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>) {
        tracing::error!(%error, sequence, ?event, "exception processing event");
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        tracing::error!(%error, "exception during event processor start");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        tracing::error!(%error, "exception during event processor shutdown");
    }
}

/// Swallows every fault silently. Mainly for overhead measurements; use
/// with care.
#[derive(Debug, Default)]
pub struct IgnoreExceptionHandler<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> IgnoreExceptionHandler<T> {
    /// Create the ignoring handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: Send + Sync> ExceptionHandler<T> for IgnoreExceptionHandler<T> {
    fn handle_event_exception(&self, _error: DisruptorError, _sequence: i64, _event: Option<&T>) {}

    fn handle_on_start_exception(&self, _error: DisruptorError) {}

    fn handle_on_shutdown_exception(&self, _error: DisruptorError) {}
}

/// Panics on any fault; fail-fast behaviour for tests.
#[derive(Debug, Default)]
pub struct PanicExceptionHandler<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> PanicExceptionHandler<T> {
    /// Create the panicking handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> ExceptionHandler<T> for PanicExceptionHandler<T>
where
    T: Debug + Send + Sync,
{
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>) {
        panic!("exception processing event at sequence {sequence}: {error}. Event: {event:?}");
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        panic!("exception during event processor start: {error}");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        panic!("exception during event processor shutdown: {error}");
    }
}

/// Closure-backed exception handler.
pub struct ClosureExceptionHandler<T, F>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
{
    on_event: F,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, F> ClosureExceptionHandler<T, F>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
{
    /// Route event faults to `on_event`; lifecycle faults are logged.
    pub fn new(on_event: F) -> Self {
        Self {
            on_event,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> ExceptionHandler<T> for ClosureExceptionHandler<T, F>
where
    T: Send + Sync,
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
{
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>) {
        (self.on_event)(error, sequence, event);
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        tracing::error!(%error, "exception during event processor start");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        tracing::error!(%error, "exception during event processor shutdown");
    }
}
