//! Event handlers: the consumer-side callback surface.
//!
//! Only [`on_event`](EventHandler::on_event) is mandatory. The remaining
//! hooks are optional capabilities with no-op defaults: lifecycle
//! notifications, batch-start observation, wait-strategy timeouts and the
//! sequence callback for mid-batch progress reporting. Overriding a default
//! is the whole registration.

use std::sync::Arc;

use crate::disruptor::{Result, Sequence};

/// Consumer callback invoked for every event a processor drains.
pub trait EventHandler<T>: Send + Sync {
    /// Process one event.
    ///
    /// `end_of_batch` is true for exactly the last event of the current
    /// batch; handlers use it to flush or commit work amortised over the
    /// batch.
    ///
    /// # Errors
    /// A returned error is routed to the processor's exception handler; the
    /// processor then skips this sequence and keeps running.
    fn on_event(&mut self, event: &mut T, sequence: i64, end_of_batch: bool) -> Result<()>;

    /// Called once when the owning processor starts, before any event.
    ///
    /// # Errors
    /// Routed to the exception handler's start hook; does not abort the run.
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once when the owning processor shuts down, after the last
    /// event.
    ///
    /// # Errors
    /// Routed to the exception handler's shutdown hook.
    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called at the start of each batch with the number of events about to
    /// be dispatched.
    ///
    /// # Errors
    /// Routed to the exception handler like an event fault.
    fn on_batch_start(&mut self, _batch_size: i64) -> Result<()> {
        Ok(())
    }

    /// Called when a timeout-capable wait strategy gave up; `sequence` is
    /// the handler's current position. A notification, not an error.
    ///
    /// # Errors
    /// Routed to the exception handler like an event fault.
    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }

    /// Receives the owning processor's sequence at construction, letting
    /// the handler publish progress before a batch completes so downstream
    /// gating can move early.
    fn set_sequence_callback(&mut self, _sequence: Arc<Sequence>) {}
}

/// Handler backed by a closure; convenient for tests and small pipelines.
pub struct ClosureEventHandler<T, F>
where
    F: FnMut(&mut T, i64, bool) -> Result<()> + Send + Sync,
{
    handler: F,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, F> ClosureEventHandler<T, F>
where
    F: FnMut(&mut T, i64, bool) -> Result<()> + Send + Sync,
{
    /// Wrap `handler` as an [`EventHandler`].
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> EventHandler<T> for ClosureEventHandler<T, F>
where
    T: Send + Sync,
    F: FnMut(&mut T, i64, bool) -> Result<()> + Send + Sync,
{
    fn on_event(&mut self, event: &mut T, sequence: i64, end_of_batch: bool) -> Result<()> {
        (self.handler)(event, sequence, end_of_batch)
    }
}

/// Handler that does nothing; useful for overhead measurements.
pub struct NoOpEventHandler<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> NoOpEventHandler<T> {
    /// Create a no-op handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> Default for NoOpEventHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> EventHandler<T> for NoOpEventHandler<T> {
    fn on_event(&mut self, _event: &mut T, _sequence: i64, _end_of_batch: bool) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct TestEvent {
        value: i64,
    }

    #[test]
    fn test_closure_handler_runs() {
        let mut handler = ClosureEventHandler::new(|event: &mut TestEvent, sequence, _eob| {
            event.value = sequence;
            Ok(())
        });

        let mut event = TestEvent::default();
        handler.on_event(&mut event, 42, false).unwrap();
        assert_eq!(event.value, 42);
    }

    #[test]
    fn test_default_capabilities_are_no_ops() {
        let mut handler = NoOpEventHandler::<TestEvent>::new();
        assert!(handler.on_start().is_ok());
        assert!(handler.on_batch_start(5).is_ok());
        assert!(handler.on_timeout(-1).is_ok());
        assert!(handler.on_shutdown().is_ok());
        handler.set_sequence_callback(Arc::new(Sequence::default()));
    }

    #[test]
    fn test_overridden_batch_start_capability() {
        struct BatchCounting {
            batches: Vec<i64>,
        }

        impl EventHandler<TestEvent> for BatchCounting {
            fn on_event(&mut self, _e: &mut TestEvent, _s: i64, _eob: bool) -> Result<()> {
                Ok(())
            }

            fn on_batch_start(&mut self, batch_size: i64) -> Result<()> {
                self.batches.push(batch_size);
                Ok(())
            }
        }

        let mut handler = BatchCounting { batches: vec![] };
        handler.on_batch_start(3).unwrap();
        handler.on_batch_start(1).unwrap();
        assert_eq!(handler.batches, vec![3, 1]);
    }
}
