//! Batch event processors: the long-running consumer loop.
//!
//! A [`BatchEventProcessor`] owns one consumer [`Sequence`], waits on its
//! barrier, and drains every available event in a batch before touching the
//! wait strategy again; that batching is what amortises the cross-thread
//! synchronisation. Its sequence is, in turn, a gating sequence for the
//! producer side.

use std::fmt::Debug;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::disruptor::{
    DataProvider, DefaultExceptionHandler, DisruptorError, EventHandler, ExceptionHandler, Result,
    Sequence, SequenceBarrier,
};

/// A long-running consumer of ring-buffer events.
pub trait EventProcessor: Send + Sync {
    /// The sequence this processor advances as it consumes.
    fn get_sequence(&self) -> Arc<Sequence>;

    /// Request shutdown and wake the processor out of its wait. Idempotent
    /// and callable from any thread.
    fn halt(&self);

    /// Whether the processor is currently running or halting.
    fn is_running(&self) -> bool;

    /// Run the processing loop on the calling thread until halted.
    ///
    /// # Errors
    /// [`DisruptorError::AlreadyRunning`] when the processor is already
    /// running on another thread.
    fn run(&self) -> Result<()>;
}

const IDLE: i32 = 0;
const HALTED: i32 = 1;
const RUNNING: i32 = 2;

/// [`EventProcessor`] that dispatches batches to an [`EventHandler`].
///
/// Handler faults never escape the loop: they are routed to the exception
/// handler and the faulting sequence is skipped, so one poisoned slot cannot
/// stall the pipeline behind this consumer's gating sequence.
pub struct BatchEventProcessor<T> {
    data_provider: Arc<dyn DataProvider<T>>,
    sequence_barrier: Arc<dyn SequenceBarrier>,
    event_handler: Mutex<Box<dyn EventHandler<T>>>,
    exception_handler: Mutex<Box<dyn ExceptionHandler<T>>>,
    sequence: Arc<Sequence>,
    running: AtomicI32,
}

impl<T> BatchEventProcessor<T>
where
    T: Debug + Send + Sync + 'static,
{
    /// Create a processor with the default (logging) exception handler.
    pub fn new(
        data_provider: Arc<dyn DataProvider<T>>,
        sequence_barrier: Arc<dyn SequenceBarrier>,
        event_handler: Box<dyn EventHandler<T>>,
    ) -> Self {
        Self::with_exception_handler(
            data_provider,
            sequence_barrier,
            event_handler,
            Box::new(DefaultExceptionHandler::new()),
        )
    }
}

impl<T> BatchEventProcessor<T>
where
    T: Send + Sync + 'static,
{
    /// Create a processor with an explicit exception handler.
    pub fn with_exception_handler(
        data_provider: Arc<dyn DataProvider<T>>,
        sequence_barrier: Arc<dyn SequenceBarrier>,
        mut event_handler: Box<dyn EventHandler<T>>,
        exception_handler: Box<dyn ExceptionHandler<T>>,
    ) -> Self {
        let sequence = Arc::new(Sequence::default());
        event_handler.set_sequence_callback(Arc::clone(&sequence));

        Self {
            data_provider,
            sequence_barrier,
            event_handler: Mutex::new(event_handler),
            exception_handler: Mutex::new(exception_handler),
            sequence,
            running: AtomicI32::new(IDLE),
        }
    }

    /// Replace the exception handler. Callable at any time, from any
    /// thread; the replacement applies from the next fault on.
    pub fn set_exception_handler(&self, exception_handler: Box<dyn ExceptionHandler<T>>) {
        *self.exception_handler.lock() = exception_handler;
    }

    /// The barrier this processor waits on.
    #[must_use]
    pub fn get_barrier(&self) -> &Arc<dyn SequenceBarrier> {
        &self.sequence_barrier
    }

    fn notify_start(&self, handler: &mut dyn EventHandler<T>) {
        if let Err(error) = handler.on_start() {
            self.exception_handler.lock().handle_on_start_exception(error);
        }
    }

    fn notify_shutdown(&self, handler: &mut dyn EventHandler<T>) {
        if let Err(error) = handler.on_shutdown() {
            self.exception_handler.lock().handle_on_shutdown_exception(error);
        }
    }

    fn notify_timeout(&self, handler: &mut dyn EventHandler<T>, sequence: i64) {
        if let Err(error) = handler.on_timeout(sequence) {
            self.exception_handler
                .lock()
                .handle_event_exception(error, sequence, None);
        }
    }

    /// Dispatch `*next_sequence..=available_sequence`, advancing
    /// `next_sequence` past every successfully handled event.
    fn drain_batch(
        &self,
        handler: &mut dyn EventHandler<T>,
        next_sequence: &mut i64,
        available_sequence: i64,
    ) -> Result<()> {
        if available_sequence >= *next_sequence {
            handler.on_batch_start(available_sequence - *next_sequence + 1)?;
        }

        while *next_sequence <= available_sequence {
            // SAFETY: the barrier returned `available_sequence`, so every
            // sequence up to it is published and handed to this processor
            // exclusively until its own sequence advances past it.
            let event = unsafe { self.data_provider.get_mut(*next_sequence) };
            handler.on_event(event, *next_sequence, *next_sequence == available_sequence)?;
            *next_sequence += 1;
        }

        Ok(())
    }

    fn process_events(&self, handler: &mut dyn EventHandler<T>) {
        let mut next_sequence = self.sequence.get() + 1;

        loop {
            match self.sequence_barrier.wait_for(next_sequence) {
                Ok(available_sequence) => {
                    match self.drain_batch(handler, &mut next_sequence, available_sequence) {
                        Ok(()) => self.sequence.set(available_sequence),
                        Err(error) => {
                            // Skip the faulting sequence so gating keeps
                            // moving.
                            let event = self.data_provider.get(next_sequence);
                            self.exception_handler.lock().handle_event_exception(
                                error,
                                next_sequence,
                                Some(event),
                            );
                            self.sequence.set(next_sequence);
                            next_sequence += 1;
                        }
                    }
                }
                Err(DisruptorError::Timeout) => {
                    self.notify_timeout(handler, self.sequence.get());
                }
                Err(DisruptorError::Alert) => {
                    if self.running.load(Ordering::Acquire) != RUNNING {
                        break;
                    }
                }
                Err(error) => {
                    self.exception_handler.lock().handle_event_exception(
                        error,
                        next_sequence,
                        None,
                    );
                    self.sequence.set(next_sequence);
                    next_sequence += 1;
                }
            }
        }
    }
}

impl<T> EventProcessor for BatchEventProcessor<T>
where
    T: Send + Sync + 'static,
{
    fn get_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    fn halt(&self) {
        self.running.store(HALTED, Ordering::Release);
        self.sequence_barrier.alert();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) != IDLE
    }

    fn run(&self) -> Result<()> {
        match self
            .running
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.sequence_barrier.clear_alert();

                let mut handler = self.event_handler.lock();
                self.notify_start(&mut **handler);
                if self.running.load(Ordering::Acquire) == RUNNING {
                    self.process_events(&mut **handler);
                }
                self.notify_shutdown(&mut **handler);
                self.running.store(IDLE, Ordering::Release);
                Ok(())
            }
            Err(RUNNING) => Err(DisruptorError::AlreadyRunning),
            Err(_) => {
                // Halted before the thread ever started: observe the
                // lifecycle, then settle back to idle.
                let mut handler = self.event_handler.lock();
                self.notify_start(&mut **handler);
                self.notify_shutdown(&mut **handler);
                self.running.store(IDLE, Ordering::Release);
                Ok(())
            }
        }
    }
}

impl<T> std::fmt::Debug for BatchEventProcessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEventProcessor")
            .field("sequence", &self.sequence)
            .field("running", &self.running.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::{
        BlockingWaitStrategy, ClosureEventHandler, DefaultEventFactory, RingBuffer, Sequenced,
    };
    use std::sync::atomic::AtomicI64;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct TestEvent {
        value: i64,
    }

    fn make_pipeline(
        buffer_size: usize,
        handler: Box<dyn EventHandler<TestEvent>>,
    ) -> (Arc<RingBuffer<TestEvent>>, Arc<BatchEventProcessor<TestEvent>>) {
        let buffer = Arc::new(
            RingBuffer::with_single_producer(
                &DefaultEventFactory::<TestEvent>::new(),
                buffer_size,
                Arc::new(BlockingWaitStrategy::new()),
            )
            .unwrap(),
        );

        let barrier = buffer.new_barrier(vec![]);
        let processor = Arc::new(BatchEventProcessor::new(
            Arc::clone(&buffer) as Arc<dyn DataProvider<TestEvent>>,
            barrier,
            handler,
        ));
        buffer.add_gating_sequences(&[processor.get_sequence()]);

        (buffer, processor)
    }

    #[test]
    fn test_processor_starts_idle() {
        let (_buffer, processor) =
            make_pipeline(8, Box::new(ClosureEventHandler::new(|_: &mut TestEvent, _, _| Ok(()))));

        assert!(!processor.is_running());
        assert_eq!(
            processor.get_sequence().get(),
            crate::disruptor::INITIAL_CURSOR_VALUE
        );
    }

    #[test]
    fn test_processor_drains_published_events() {
        let seen = Arc::new(AtomicI64::new(0));
        let handler = {
            let seen = Arc::clone(&seen);
            ClosureEventHandler::new(move |event: &mut TestEvent, sequence, _eob| {
                assert_eq!(event.value, sequence);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        let (buffer, processor) = make_pipeline(8, Box::new(handler));

        for _ in 0..6 {
            let sequence = buffer.next().unwrap();
            // SAFETY: claimed and unpublished.
            unsafe { DataProvider::get_mut(buffer.as_ref(), sequence).value = sequence };
            buffer.publish(sequence);
        }

        let worker = {
            let processor = Arc::clone(&processor);
            thread::spawn(move || processor.run())
        };

        while seen.load(Ordering::SeqCst) < 6 {
            thread::yield_now();
        }

        processor.halt();
        worker.join().unwrap().unwrap();
        assert_eq!(processor.get_sequence().get(), 5);
        assert!(!processor.is_running());
    }

    #[test]
    fn test_second_run_fails_while_running() {
        let (_buffer, processor) =
            make_pipeline(8, Box::new(ClosureEventHandler::new(|_: &mut TestEvent, _, _| Ok(()))));

        let worker = {
            let processor = Arc::clone(&processor);
            thread::spawn(move || processor.run())
        };

        while !processor.is_running() {
            thread::yield_now();
        }
        // Give the first run time to reach its wait.
        thread::sleep(Duration::from_millis(5));

        assert!(matches!(
            processor.run(),
            Err(DisruptorError::AlreadyRunning)
        ));

        processor.halt();
        worker.join().unwrap().unwrap();
    }

    #[test]
    fn test_halt_before_run_is_lifecycle_only() {
        struct Lifecycle {
            starts: Arc<AtomicI64>,
            shutdowns: Arc<AtomicI64>,
            events: Arc<AtomicI64>,
        }

        impl EventHandler<TestEvent> for Lifecycle {
            fn on_event(&mut self, _e: &mut TestEvent, _s: i64, _eob: bool) -> Result<()> {
                self.events.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }

            fn on_start(&mut self) -> Result<()> {
                self.starts.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }

            fn on_shutdown(&mut self) -> Result<()> {
                self.shutdowns.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let starts = Arc::new(AtomicI64::new(0));
        let shutdowns = Arc::new(AtomicI64::new(0));
        let events = Arc::new(AtomicI64::new(0));

        let (_buffer, processor) = make_pipeline(
            8,
            Box::new(Lifecycle {
                starts: Arc::clone(&starts),
                shutdowns: Arc::clone(&shutdowns),
                events: Arc::clone(&events),
            }),
        );

        processor.halt();
        processor.run().unwrap();

        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(events.load(Ordering::SeqCst), 0);
        assert!(!processor.is_running());
    }
}
