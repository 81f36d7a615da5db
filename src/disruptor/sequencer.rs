//! Sequencers: claiming and publishing sequence ranges.
//!
//! A sequencer owns the producer cursor and the set of gating (downstream
//! consumer) sequences. Its single invariant is wrap prevention: no claimed
//! sequence may be more than one full ring ahead of the slowest gating
//! sequence, so a producer can never overwrite a slot that has not been
//! consumed.

use std::cell::Cell;
use std::sync::atomic::{fence, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;

use crate::disruptor::{
    is_power_of_two, Cursored, DisruptorError, ProcessingSequenceBarrier, Result, Sequence,
    SequenceBarrier, WaitStrategy,
};

/// Brief pause used while a claim is wrap-gated. Politeness, not
/// correctness: the claim loop retries after every park.
const GATED_PARK: Duration = Duration::from_nanos(1);

/// Coordinator for claiming and publishing sequences over a ring of slots.
pub trait Sequencer: Cursored + Send + Sync + std::fmt::Debug {
    /// Capacity of the ring this sequencer covers.
    fn get_buffer_size(&self) -> usize;

    /// Whether `required_capacity` further sequences could be claimed right
    /// now. Concurrent callers make this an indication only.
    fn has_available_capacity(&self, required_capacity: i64) -> bool;

    /// Free slots: capacity minus the distance the producer is ahead of the
    /// slowest gating sequence.
    fn remaining_capacity(&self) -> i64;

    /// Claim the next sequence, blocking while wrap prevention requires.
    ///
    /// # Errors
    /// Never fails for a single-slot claim; shares the signature of
    /// [`next_n`](Self::next_n).
    fn next(&self) -> Result<i64>;

    /// Claim the next `n` contiguous sequences, blocking while wrap
    /// prevention requires, and return the highest.
    ///
    /// # Errors
    /// [`DisruptorError::InvalidBatchSize`] unless `1 <= n <= buffer_size`.
    fn next_n(&self, n: i64) -> Result<i64>;

    /// Claim the next sequence without blocking.
    ///
    /// # Errors
    /// [`DisruptorError::InsufficientCapacity`] when the claim would
    /// overtake a gating sequence.
    fn try_next(&self) -> Result<i64>;

    /// Claim the next `n` sequences without blocking; returns the highest.
    ///
    /// # Errors
    /// [`DisruptorError::InvalidBatchSize`] for an out-of-range `n`,
    /// [`DisruptorError::InsufficientCapacity`] when the ring is too full.
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Mark `sequence` as published and wake blocked consumers. Must be
    /// called exactly once per claimed sequence.
    fn publish(&self, sequence: i64);

    /// Publish every sequence in `lo..=hi`, then wake blocked consumers.
    fn publish_range(&self, lo: i64, hi: i64);

    /// Whether `sequence` has been published and is safe to read.
    fn is_available(&self, sequence: i64) -> bool;

    /// Highest sequence in `next_sequence..=available_sequence` such that
    /// every sequence up to it is published; `next_sequence - 1` when the
    /// lower bound itself is unpublished.
    fn get_highest_published_sequence(
        &self,
        next_sequence: i64,
        available_sequence: i64,
    ) -> i64;

    /// Add consumer sequences that gate this producer.
    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]);

    /// Remove a gating sequence; returns whether it was present.
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;

    /// Minimum of the gating sequences and the current cursor.
    fn get_minimum_sequence(&self) -> i64;

    /// Create a barrier gated on this sequencer's cursor and
    /// `sequences_to_track`.
    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: Vec<Arc<Sequence>>,
    ) -> Arc<dyn SequenceBarrier>;

    /// Set the claim position directly, bypassing wrap prevention.
    ///
    /// Recovery-only administrative primitive.
    ///
    /// # Safety
    /// Must not race with [`next`](Self::next), [`try_next`](Self::try_next)
    /// or [`publish`](Self::publish) on any thread; the caller takes over
    /// the sequencer's claim invariant entirely.
    unsafe fn claim(&self, sequence: i64);
}

fn validate_batch(n: i64, buffer_size: usize) -> Result<()> {
    if n < 1 || n > buffer_size as i64 {
        return Err(DisruptorError::InvalidBatchSize(n));
    }
    Ok(())
}

/// Sequencer for exactly one producer thread.
///
/// `next_value` and `cached_value` are deliberately plain (non-atomic)
/// fields: only the producer thread reads or writes them. The cursor is the
/// only value published to consumers, and only on
/// [`publish`](Sequencer::publish).
#[derive(Debug)]
pub struct SingleProducerSequencer {
    buffer_size: usize,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    gating_sequences: RwLock<Vec<Arc<Sequence>>>,
    /// Last claimed sequence; producer-thread private.
    next_value: CachePadded<Cell<i64>>,
    /// Cached minimum of the gating sequences; producer-thread private.
    cached_value: CachePadded<Cell<i64>>,
}

// SAFETY: the `Cell` fields are only touched by the claim-side methods
// (`next*`, `try_next*`, `claim`, capacity queries), which the type's
// contract restricts to a single producer thread. Everything consumers read
// concurrently (`cursor`, `gating_sequences`) is atomic or locked.
unsafe impl Sync for SingleProducerSequencer {}

impl SingleProducerSequencer {
    /// Create a sequencer for one producer over `buffer_size` slots.
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::default()),
            gating_sequences: RwLock::new(Vec::new()),
            next_value: CachePadded::new(Cell::new(crate::disruptor::INITIAL_CURSOR_VALUE)),
            cached_value: CachePadded::new(Cell::new(crate::disruptor::INITIAL_CURSOR_VALUE)),
        }
    }

    fn has_capacity(&self, required_capacity: i64, do_store: bool) -> bool {
        let next_value = self.next_value.get();
        let wrap_point = (next_value + required_capacity) - self.buffer_size as i64;
        let cached_gating_sequence = self.cached_value.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            if do_store {
                // StoreLoad: slot writes made before this claim attempt must
                // be ordered before the gating reads below.
                fence(Ordering::SeqCst);
            }

            let min_sequence =
                Sequence::get_minimum_sequence(&self.gating_sequences.read(), next_value);
            self.cached_value.set(min_sequence);

            return wrap_point <= min_sequence;
        }

        true
    }
}

impl Cursored for SingleProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }
}

impl Sequencer for SingleProducerSequencer {
    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.has_capacity(required_capacity, false)
    }

    fn remaining_capacity(&self) -> i64 {
        let next_value = self.next_value.get();
        let consumed =
            Sequence::get_minimum_sequence(&self.gating_sequences.read(), next_value);
        self.buffer_size as i64 - (next_value - consumed)
    }

    fn next(&self) -> Result<i64> {
        self.next_n(1)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        validate_batch(n, self.buffer_size)?;

        let next_value = self.next_value.get();
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.buffer_size as i64;
        let cached_gating_sequence = self.cached_value.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            fence(Ordering::SeqCst);

            loop {
                let min_sequence =
                    Sequence::get_minimum_sequence(&self.gating_sequences.read(), next_value);
                if wrap_point <= min_sequence {
                    self.cached_value.set(min_sequence);
                    break;
                }
                thread::park_timeout(GATED_PARK);
            }
        }

        self.next_value.set(next_sequence);
        Ok(next_sequence)
    }

    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        validate_batch(n, self.buffer_size)?;

        if !self.has_capacity(n, true) {
            return Err(DisruptorError::InsufficientCapacity);
        }

        let next_sequence = self.next_value.get() + n;
        self.next_value.set(next_sequence);
        Ok(next_sequence)
    }

    fn publish(&self, sequence: i64) {
        self.cursor.set(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, _lo: i64, hi: i64) {
        // Contiguous claims publish contiguously; the cursor covers the lot.
        self.publish(hi);
    }

    fn is_available(&self, sequence: i64) -> bool {
        sequence <= self.cursor.get()
    }

    fn get_highest_published_sequence(
        &self,
        _next_sequence: i64,
        available_sequence: i64,
    ) -> i64 {
        available_sequence
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.gating_sequences.write().extend_from_slice(gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        let mut sequences = self.gating_sequences.write();
        if let Some(pos) = sequences.iter().position(|s| Arc::ptr_eq(s, sequence)) {
            sequences.remove(pos);
            true
        } else {
            false
        }
    }

    fn get_minimum_sequence(&self) -> i64 {
        Sequence::get_minimum_sequence(&self.gating_sequences.read(), self.cursor.get())
    }

    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: Vec<Arc<Sequence>>,
    ) -> Arc<dyn SequenceBarrier> {
        Arc::new(ProcessingSequenceBarrier::new(
            Arc::clone(&self.cursor),
            Arc::clone(&self.wait_strategy),
            sequences_to_track,
            self,
        ))
    }

    unsafe fn claim(&self, sequence: i64) {
        self.next_value.set(sequence);
    }
}

/// Sequencer safe for concurrent producers.
///
/// Producers race on the cursor with CAS, so the cursor advances before the
/// matching slots are written. Publication is therefore recorded per slot:
/// each cell of `available_buffer` holds the round number
/// (`sequence >> log2(buffer_size)`) of the pass that most recently
/// published it, and a sequence is readable iff its slot carries its round.
/// This keeps publishers free of any shared publish cursor while preserving
/// exact ordering for readers.
#[derive(Debug)]
pub struct MultiProducerSequencer {
    buffer_size: usize,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    gating_sequences: RwLock<Vec<Arc<Sequence>>>,
    /// Cached minimum gating sequence, shared between producers.
    gating_sequence_cache: Sequence,
    /// Round number of the latest publish per slot; −1 when never published.
    available_buffer: Box<[AtomicI64]>,
    index_mask: usize,
    index_shift: u32,
}

impl MultiProducerSequencer {
    /// Create a sequencer for concurrent producers over `buffer_size` slots.
    ///
    /// # Errors
    /// [`DisruptorError::InvalidBufferSize`] unless `buffer_size` is a
    /// non-zero power of two.
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        if !is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        let available_buffer: Box<[AtomicI64]> = (0..buffer_size)
            .map(|_| AtomicI64::new(crate::disruptor::INITIAL_CURSOR_VALUE))
            .collect();

        Ok(Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::default()),
            gating_sequences: RwLock::new(Vec::new()),
            gating_sequence_cache: Sequence::default(),
            available_buffer,
            index_mask: buffer_size - 1,
            index_shift: buffer_size.trailing_zeros(),
        })
    }

    #[inline]
    fn calculate_index(&self, sequence: i64) -> usize {
        (sequence as usize) & self.index_mask
    }

    #[inline]
    fn calculate_availability_flag(&self, sequence: i64) -> i64 {
        sequence >> self.index_shift
    }

    /// Record `sequence` as published. The release store is the write half
    /// of the happens-before edge carrying the slot payload to consumers.
    fn set_available(&self, sequence: i64) {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].store(flag, Ordering::Release);
    }

    fn has_capacity(&self, required_capacity: i64, cursor_value: i64) -> bool {
        let wrap_point = (cursor_value + required_capacity) - self.buffer_size as i64;
        let cached_gating_sequence = self.gating_sequence_cache.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > cursor_value {
            let min_sequence =
                Sequence::get_minimum_sequence(&self.gating_sequences.read(), cursor_value);
            self.gating_sequence_cache.set(min_sequence);

            return wrap_point <= min_sequence;
        }

        true
    }
}

impl Cursored for MultiProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }
}

impl Sequencer for MultiProducerSequencer {
    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.has_capacity(required_capacity, self.cursor.get())
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.cursor.get();
        let consumed =
            Sequence::get_minimum_sequence(&self.gating_sequences.read(), produced);
        self.buffer_size as i64 - (produced - consumed)
    }

    fn next(&self) -> Result<i64> {
        self.next_n(1)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        validate_batch(n, self.buffer_size)?;

        loop {
            let current = self.cursor.get();
            let next = current + n;
            let wrap_point = next - self.buffer_size as i64;
            let cached_gating_sequence = self.gating_sequence_cache.get();

            if wrap_point > cached_gating_sequence || cached_gating_sequence > current {
                let gating_sequence =
                    Sequence::get_minimum_sequence(&self.gating_sequences.read(), current);

                if wrap_point > gating_sequence {
                    thread::park_timeout(GATED_PARK);
                    continue;
                }

                self.gating_sequence_cache.set(gating_sequence);
            } else if self.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        validate_batch(n, self.buffer_size)?;

        loop {
            let current = self.cursor.get();
            let next = current + n;

            if !self.has_capacity(n, current) {
                return Err(DisruptorError::InsufficientCapacity);
            }

            if self.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn publish(&self, sequence: i64) {
        self.set_available(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        for sequence in lo..=hi {
            self.set_available(sequence);
        }
        self.wait_strategy.signal_all_when_blocking();
    }

    fn is_available(&self, sequence: i64) -> bool {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].load(Ordering::Acquire) == flag
    }

    fn get_highest_published_sequence(
        &self,
        next_sequence: i64,
        available_sequence: i64,
    ) -> i64 {
        for sequence in next_sequence..=available_sequence {
            if !self.is_available(sequence) {
                return sequence - 1;
            }
        }

        available_sequence
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.gating_sequences.write().extend_from_slice(gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        let mut sequences = self.gating_sequences.write();
        if let Some(pos) = sequences.iter().position(|s| Arc::ptr_eq(s, sequence)) {
            sequences.remove(pos);
            true
        } else {
            false
        }
    }

    fn get_minimum_sequence(&self) -> i64 {
        Sequence::get_minimum_sequence(&self.gating_sequences.read(), self.cursor.get())
    }

    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: Vec<Arc<Sequence>>,
    ) -> Arc<dyn SequenceBarrier> {
        Arc::new(ProcessingSequenceBarrier::new(
            Arc::clone(&self.cursor),
            Arc::clone(&self.wait_strategy),
            sequences_to_track,
            self,
        ))
    }

    unsafe fn claim(&self, sequence: i64) {
        self.cursor.set(sequence);
    }
}
