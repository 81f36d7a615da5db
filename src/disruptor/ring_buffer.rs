//! The preallocated ring of event slots.
//!
//! All slots are constructed up front by an [`EventFactory`]; afterwards
//! events are only ever mutated in place, so the hot path performs no
//! allocation. A sequence maps to its slot with a mask
//! (`sequence & (capacity - 1)`), which is why capacities must be powers of
//! two. The buffer hosts the [`Sequencer`] and is both the producer handle
//! and the consumers' [`DataProvider`].

use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::disruptor::{
    is_power_of_two, Cursored, DataProvider, DisruptorError, EventFactory, EventSink,
    EventTranslator, EventTranslatorOneArg, EventTranslatorThreeArg, EventTranslatorTwoArg,
    MultiProducerSequencer, Result, Sequence, SequenceBarrier, Sequenced, Sequencer,
    SingleProducerSequencer, WaitStrategy,
};

/// Fixed-capacity ring of pre-constructed events coordinated by a sequencer.
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
    index_mask: i64,
    sequencer: Arc<dyn Sequencer>,
}

// SAFETY: slots are only reached through the sequencing protocol. A slot has
// exactly one writer at a time (the producer that claimed its sequence, or
// the consumer a barrier handed it to) and readers only see slots on the far
// side of a release/acquire publish edge, so the `UnsafeCell` accesses are
// disjoint in time.
unsafe impl<T: Send + Sync> Send for RingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T>
where
    T: Send + Sync,
{
    /// Create a ring buffer over the given sequencer, filling every slot
    /// from `event_factory`.
    ///
    /// # Errors
    /// [`DisruptorError::InvalidBufferSize`] unless the sequencer's buffer
    /// size is a non-zero power of two.
    pub fn new<F>(event_factory: &F, sequencer: Arc<dyn Sequencer>) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let buffer_size = sequencer.get_buffer_size();
        if !is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        let slots: Box<[UnsafeCell<T>]> = (0..buffer_size)
            .map(|_| UnsafeCell::new(event_factory.new_instance()))
            .collect();

        Ok(Self {
            slots,
            index_mask: (buffer_size - 1) as i64,
            sequencer,
        })
    }

    /// Create a ring buffer with a [`SingleProducerSequencer`].
    ///
    /// # Errors
    /// [`DisruptorError::InvalidBufferSize`] for a non-power-of-two size.
    pub fn with_single_producer<F>(
        event_factory: &F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        if !is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }
        let sequencer = Arc::new(SingleProducerSequencer::new(buffer_size, wait_strategy));
        Self::new(event_factory, sequencer)
    }

    /// Create a ring buffer with a [`MultiProducerSequencer`].
    ///
    /// # Errors
    /// [`DisruptorError::InvalidBufferSize`] for a non-power-of-two size.
    pub fn with_multi_producer<F>(
        event_factory: &F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let sequencer = Arc::new(MultiProducerSequencer::new(buffer_size, wait_strategy)?);
        Self::new(event_factory, sequencer)
    }

    /// The event at `sequence`'s slot.
    ///
    /// No bounds check beyond the index mask; callers rely on the
    /// sequencing protocol for exclusive/immutable access windows.
    #[inline]
    #[must_use]
    pub fn get(&self, sequence: i64) -> &T {
        let index = (sequence & self.index_mask) as usize;
        // SAFETY: masking keeps the index in bounds; the sequencing protocol
        // guarantees no writer holds this slot while a reader observes it.
        unsafe { &*self.slots.get_unchecked(index).get() }
    }

    /// Capacity of the ring.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.slots.len()
    }

    /// The sequencer coordinating this buffer.
    #[must_use]
    pub fn sequencer(&self) -> &Arc<dyn Sequencer> {
        &self.sequencer
    }

    /// Whether `sequence` has been published.
    #[must_use]
    pub fn is_available(&self, sequence: i64) -> bool {
        self.sequencer.is_available(sequence)
    }

    /// Register consumer sequences that gate the producer side.
    pub fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.sequencer.add_gating_sequences(gating_sequences);
    }

    /// Remove a gating sequence; returns whether it was present.
    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.sequencer.remove_gating_sequence(sequence)
    }

    /// Create a barrier over this buffer's cursor and `sequences_to_track`.
    #[must_use]
    pub fn new_barrier(&self, sequences_to_track: Vec<Arc<Sequence>>) -> Arc<dyn SequenceBarrier> {
        Arc::clone(&self.sequencer).new_barrier(sequences_to_track)
    }

    /// Minimum of the gating sequences and the cursor.
    #[must_use]
    pub fn get_minimum_gating_sequence(&self) -> i64 {
        self.sequencer.get_minimum_sequence()
    }

    /// Claim a slot, write it through `translator`, publish.
    ///
    /// # Errors
    /// Claim errors from [`Sequenced::next`].
    pub fn publish_event<TR>(&self, translator: &TR) -> Result<()>
    where
        TR: EventTranslator<T> + ?Sized,
    {
        let sequence = self.sequencer.next()?;
        self.write_and_publish(sequence, |event, seq| translator.translate_to(event, seq));
        Ok(())
    }

    /// Non-blocking [`publish_event`](Self::publish_event).
    ///
    /// # Errors
    /// [`DisruptorError::InsufficientCapacity`] when the ring is full.
    pub fn try_publish_event<TR>(&self, translator: &TR) -> Result<()>
    where
        TR: EventTranslator<T> + ?Sized,
    {
        let sequence = self.sequencer.try_next()?;
        self.write_and_publish(sequence, |event, seq| translator.translate_to(event, seq));
        Ok(())
    }

    /// [`publish_event`](Self::publish_event) with one translator argument.
    ///
    /// # Errors
    /// Claim errors from [`Sequenced::next`].
    pub fn publish_event_one_arg<A, TR>(&self, translator: &TR, arg0: A) -> Result<()>
    where
        TR: EventTranslatorOneArg<T, A> + ?Sized,
    {
        let sequence = self.sequencer.next()?;
        self.write_and_publish(sequence, |event, seq| {
            translator.translate_to(event, seq, arg0);
        });
        Ok(())
    }

    /// [`publish_event`](Self::publish_event) with two translator arguments.
    ///
    /// # Errors
    /// Claim errors from [`Sequenced::next`].
    pub fn publish_event_two_arg<A, B, TR>(&self, translator: &TR, arg0: A, arg1: B) -> Result<()>
    where
        TR: EventTranslatorTwoArg<T, A, B> + ?Sized,
    {
        let sequence = self.sequencer.next()?;
        self.write_and_publish(sequence, |event, seq| {
            translator.translate_to(event, seq, arg0, arg1);
        });
        Ok(())
    }

    /// [`publish_event`](Self::publish_event) with three translator
    /// arguments.
    ///
    /// # Errors
    /// Claim errors from [`Sequenced::next`].
    pub fn publish_event_three_arg<A, B, C, TR>(
        &self,
        translator: &TR,
        arg0: A,
        arg1: B,
        arg2: C,
    ) -> Result<()>
    where
        TR: EventTranslatorThreeArg<T, A, B, C> + ?Sized,
    {
        let sequence = self.sequencer.next()?;
        self.write_and_publish(sequence, |event, seq| {
            translator.translate_to(event, seq, arg0, arg1, arg2);
        });
        Ok(())
    }

    /// Run `write` over the claimed slot, publishing on the way out even if
    /// the writer panics. An unpublished claim would gate every later
    /// sequence forever and deadlock all producers.
    fn write_and_publish<F>(&self, sequence: i64, write: F)
    where
        F: FnOnce(&mut T, i64),
    {
        struct PublishOnDrop<'a> {
            sequencer: &'a dyn Sequencer,
            sequence: i64,
        }

        impl Drop for PublishOnDrop<'_> {
            fn drop(&mut self) {
                self.sequencer.publish(self.sequence);
            }
        }

        let _publish = PublishOnDrop {
            sequencer: self.sequencer.as_ref(),
            sequence,
        };

        let index = (sequence & self.index_mask) as usize;
        // SAFETY: `sequence` is claimed by this producer and unpublished, so
        // no other thread can touch its slot until the publish below.
        let event = unsafe { &mut *self.slots.get_unchecked(index).get() };
        write(event, sequence);
    }
}

impl<T: Send + Sync> Cursored for RingBuffer<T> {
    fn get_cursor(&self) -> i64 {
        self.sequencer.get_cursor()
    }
}

impl<T: Send + Sync> Sequenced for RingBuffer<T> {
    fn get_buffer_size(&self) -> usize {
        self.slots.len()
    }

    fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.sequencer.has_available_capacity(required_capacity)
    }

    fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    fn next(&self) -> Result<i64> {
        self.sequencer.next()
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        self.sequencer.next_n(n)
    }

    fn try_next(&self) -> Result<i64> {
        self.sequencer.try_next()
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        self.sequencer.try_next_n(n)
    }

    fn publish(&self, sequence: i64) {
        self.sequencer.publish(sequence);
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        self.sequencer.publish_range(lo, hi);
    }
}

impl<T: Send + Sync> DataProvider<T> for RingBuffer<T> {
    fn get(&self, sequence: i64) -> &T {
        self.get(sequence)
    }

    unsafe fn get_mut(&self, sequence: i64) -> &mut T {
        let index = (sequence & self.index_mask) as usize;
        // SAFETY: the caller upholds the exclusive-access contract of
        // `DataProvider::get_mut`; masking keeps the index in bounds.
        &mut *self.slots.get_unchecked(index).get()
    }
}

impl<T: Send + Sync> EventSink<T> for RingBuffer<T> {
    fn publish_event(&self, translator: &dyn EventTranslator<T>) -> Result<()> {
        self.publish_event(translator)
    }

    fn try_publish_event(&self, translator: &dyn EventTranslator<T>) -> Result<()> {
        self.try_publish_event(translator)
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.slots.len())
            .field("sequencer", &self.sequencer)
            .finish_non_exhaustive()
    }
}
