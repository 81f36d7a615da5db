//! The wiring DSL: ring buffer, processors and threads assembled in one
//! place.
//!
//! [`Disruptor`] is a convenience shell over the core: it builds the ring,
//! chains consumer stages through barriers so they form a DAG with the
//! producer at the source, spawns one thread per processor, and tears the
//! lot down in order. Nothing here adds semantics beyond the core types.

use std::fmt::Debug;
use std::sync::Arc;

use crate::disruptor::{
    DataProvider, BatchEventProcessor, DisruptorError, EventFactory, EventHandler,
    EventProcessor, EventTranslator, ProducerType, Result, RingBuffer, Sequence, ThreadBuilder,
    WaitStrategy,
};
use crate::disruptor::core_interfaces::Cursored;

/// Configured pipeline of a ring buffer plus its event processors.
pub struct Disruptor<T>
where
    T: Send + Sync + 'static,
{
    ring_buffer: Arc<RingBuffer<T>>,
    event_processors: Vec<Arc<BatchEventProcessor<T>>>,
    threads: Vec<crate::disruptor::ManagedThread>,
    started: bool,
}

impl<T> Disruptor<T>
where
    T: Debug + Send + Sync + 'static,
{
    /// Create a disruptor over a fresh ring buffer.
    ///
    /// # Errors
    /// [`DisruptorError::InvalidBufferSize`] for a non-power-of-two
    /// `buffer_size`.
    pub fn new<F>(
        event_factory: &F,
        buffer_size: usize,
        producer_type: ProducerType,
        wait_strategy: Box<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let wait_strategy: Arc<dyn WaitStrategy> = Arc::from(wait_strategy);
        let ring_buffer = match producer_type {
            ProducerType::Single => {
                RingBuffer::with_single_producer(event_factory, buffer_size, wait_strategy)?
            }
            ProducerType::Multi => {
                RingBuffer::with_multi_producer(event_factory, buffer_size, wait_strategy)?
            }
        };

        Ok(Self {
            ring_buffer: Arc::new(ring_buffer),
            event_processors: Vec::new(),
            threads: Vec::new(),
            started: false,
        })
    }

    /// Create a single-producer disruptor with a blocking wait strategy.
    ///
    /// # Errors
    /// As [`Disruptor::new`].
    pub fn with_defaults<F>(event_factory: &F, buffer_size: usize) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        Self::new(
            event_factory,
            buffer_size,
            ProducerType::Single,
            Box::new(crate::disruptor::BlockingWaitStrategy::new()),
        )
    }

    /// Add the first consumer stage, gated only on the producer cursor.
    pub fn handle_events_with<H>(mut self, event_handler: H) -> DisruptorBuilder<T>
    where
        H: EventHandler<T> + 'static,
    {
        let sequence = self.add_processor(Box::new(event_handler), Vec::new());
        DisruptorBuilder {
            disruptor: self,
            last_sequences: vec![sequence],
            current_dependencies: Vec::new(),
        }
    }

    fn add_processor(
        &mut self,
        event_handler: Box<dyn EventHandler<T>>,
        dependencies: Vec<Arc<Sequence>>,
    ) -> Arc<Sequence> {
        let barrier = self.ring_buffer.new_barrier(dependencies.clone());
        let processor = Arc::new(BatchEventProcessor::new(
            Arc::clone(&self.ring_buffer) as Arc<dyn DataProvider<T>>,
            barrier,
            event_handler,
        ));

        let sequence = processor.get_sequence();
        self.ring_buffer.add_gating_sequences(&[Arc::clone(&sequence)]);

        // Only the tail of each chain gates the producer; a stage's
        // dependencies are already covered transitively.
        for dependency in &dependencies {
            self.ring_buffer.remove_gating_sequence(dependency);
        }

        self.event_processors.push(processor);
        sequence
    }

    /// Spawn one thread per configured processor.
    ///
    /// # Errors
    /// [`DisruptorError::AlreadyRunning`] when already started.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(DisruptorError::AlreadyRunning);
        }

        for (index, processor) in self.event_processors.iter().enumerate() {
            let processor = Arc::clone(processor);
            let name = format!("processor-{index}");
            let thread = ThreadBuilder::new().thread_name(name).spawn(move || {
                if let Err(error) = processor.run() {
                    tracing::error!(%error, "event processor exited with error");
                }
            });
            self.threads.push(thread);
        }

        self.started = true;
        tracing::debug!(
            processors = self.event_processors.len(),
            buffer_size = self.ring_buffer.buffer_size(),
            "disruptor started"
        );
        Ok(())
    }

    /// Drain outstanding events, then halt all processors and join their
    /// threads.
    ///
    /// Blocks until every consumer has caught up with the producer cursor;
    /// a consumer that never progresses blocks shutdown, exactly as it
    /// blocks producers.
    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }

        let cursor = self.ring_buffer.get_cursor();
        while self
            .event_processors
            .iter()
            .any(|p| p.get_sequence().get() < cursor)
        {
            std::thread::yield_now();
        }

        self.halt();
        tracing::debug!("disruptor shut down");
    }

    /// Halt all processors immediately, without draining, and join their
    /// threads.
    pub fn halt(&mut self) {
        for processor in &self.event_processors {
            processor.halt();
        }
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
        self.started = false;
    }

    /// The underlying ring buffer.
    #[must_use]
    pub fn get_ring_buffer(&self) -> &Arc<RingBuffer<T>> {
        &self.ring_buffer
    }

    /// Current producer cursor value.
    #[must_use]
    pub fn get_cursor(&self) -> i64 {
        use crate::disruptor::Cursored;
        self.ring_buffer.get_cursor()
    }

    /// Capacity of the ring.
    #[must_use]
    pub fn get_buffer_size(&self) -> usize {
        self.ring_buffer.buffer_size()
    }

    /// Free slots left in the ring.
    #[must_use]
    pub fn get_remaining_capacity(&self) -> i64 {
        use crate::disruptor::Sequenced;
        self.ring_buffer.remaining_capacity()
    }

    /// Publish one event through a translator, blocking for capacity.
    ///
    /// # Errors
    /// Claim errors from the sequencer.
    pub fn publish_event<TR>(&self, translator: &TR) -> Result<()>
    where
        TR: EventTranslator<T> + ?Sized,
    {
        self.ring_buffer.publish_event(translator)
    }

    /// Publish one event through a translator without blocking.
    ///
    /// # Errors
    /// [`DisruptorError::InsufficientCapacity`] when the ring is full.
    pub fn try_publish_event<TR>(&self, translator: &TR) -> Result<()>
    where
        TR: EventTranslator<T> + ?Sized,
    {
        self.ring_buffer.try_publish_event(translator)
    }
}

impl<T> Drop for Disruptor<T>
where
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        for processor in &self.event_processors {
            processor.halt();
        }
        self.threads.clear();
    }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for Disruptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disruptor")
            .field("buffer_size", &self.ring_buffer.buffer_size())
            .field("processors", &self.event_processors.len())
            .field("started", &self.started)
            .finish()
    }
}

/// Builder stage returned by [`Disruptor::handle_events_with`].
///
/// Each [`then`](DisruptorBuilder::then) call appends a stage gated on the
/// previous one, encoding the consumer DAG through barrier dependencies.
pub struct DisruptorBuilder<T>
where
    T: Send + Sync + 'static,
{
    disruptor: Disruptor<T>,
    last_sequences: Vec<Arc<Sequence>>,
    current_dependencies: Vec<Arc<Sequence>>,
}

impl<T> DisruptorBuilder<T>
where
    T: Debug + Send + Sync + 'static,
{
    /// Add a stage that only sees events the previous stage has finished.
    pub fn then<H>(mut self, event_handler: H) -> Self
    where
        H: EventHandler<T> + 'static,
    {
        let dependencies = std::mem::take(&mut self.last_sequences);
        let sequence = self
            .disruptor
            .add_processor(Box::new(event_handler), dependencies.clone());
        self.current_dependencies = dependencies;
        self.last_sequences = vec![sequence];
        self
    }

    /// Add a stage running in parallel with the previous one, on the same
    /// dependencies.
    pub fn and<H>(mut self, event_handler: H) -> Self
    where
        H: EventHandler<T> + 'static,
    {
        let sequence = self
            .disruptor
            .add_processor(Box::new(event_handler), self.current_dependencies.clone());
        self.last_sequences.push(sequence);
        self
    }

    /// Finish wiring and return the disruptor.
    #[must_use]
    pub fn build(self) -> Disruptor<T> {
        self.disruptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::{event_translator, DefaultEventFactory, NoOpEventHandler};

    #[derive(Debug, Default)]
    struct TestEvent {
        value: i64,
    }

    #[test]
    fn test_rejects_invalid_buffer_size() {
        let factory = DefaultEventFactory::<TestEvent>::new();
        let result = Disruptor::with_defaults(&factory, 1000);
        assert!(matches!(
            result,
            Err(DisruptorError::InvalidBufferSize(1000))
        ));
    }

    #[test]
    fn test_builder_chains_processors() {
        let factory = DefaultEventFactory::<TestEvent>::new();
        let disruptor = Disruptor::with_defaults(&factory, 64)
            .unwrap()
            .handle_events_with(NoOpEventHandler::<TestEvent>::new())
            .then(NoOpEventHandler::<TestEvent>::new())
            .build();

        assert_eq!(disruptor.event_processors.len(), 2);
        // Only the tail stage gates the producer.
        assert_eq!(disruptor.get_remaining_capacity(), 64);
    }

    #[test]
    fn test_start_publish_shutdown() {
        let factory = DefaultEventFactory::<TestEvent>::new();
        let mut disruptor = Disruptor::with_defaults(&factory, 64)
            .unwrap()
            .handle_events_with(NoOpEventHandler::<TestEvent>::new())
            .build();

        disruptor.start().unwrap();
        assert!(matches!(
            disruptor.start(),
            Err(DisruptorError::AlreadyRunning)
        ));

        let translator = event_translator(|event: &mut TestEvent, sequence| {
            event.value = sequence;
        });
        for _ in 0..10 {
            disruptor.publish_event(&translator).unwrap();
        }

        disruptor.shutdown();
        assert_eq!(disruptor.get_cursor(), 9);
    }
}
