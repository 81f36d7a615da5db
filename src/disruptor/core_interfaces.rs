//! Seam traits that decouple the core pieces from each other.
//!
//! These are the interfaces external collaborators program against: cursor
//! observation, sequence claiming, slot access and translator-based
//! publishing. The ring buffer implements all of them; tests and adapters
//! may substitute their own.

use crate::disruptor::{EventTranslator, Result};

/// Anything that exposes a cursor position.
pub trait Cursored {
    /// The current cursor value.
    fn get_cursor(&self) -> i64;
}

/// Claiming and publishing operations over a ring of sequences.
pub trait Sequenced {
    /// Capacity of the underlying ring.
    fn get_buffer_size(&self) -> usize;

    /// Whether `required_capacity` sequences could be claimed right now.
    /// Concurrent callers make this an indication only.
    fn has_available_capacity(&self, required_capacity: i64) -> bool;

    /// Number of slots currently free.
    fn remaining_capacity(&self) -> i64;

    /// Claim the next sequence, blocking while the ring is full.
    ///
    /// # Errors
    /// See [`Sequenced::next_n`].
    fn next(&self) -> Result<i64>;

    /// Claim the next `n` sequences, blocking while the ring is full.
    ///
    /// Batch producing requires publishing the whole claimed range:
    ///
    /// ```ignore
    /// let hi = ring.next_n(n)?;
    /// let lo = hi - (n - 1);
    /// for sequence in lo..=hi {
    ///     // write slot `sequence`
    /// }
    /// ring.publish_range(lo, hi);
    /// ```
    ///
    /// # Errors
    /// [`crate::disruptor::DisruptorError::InvalidBatchSize`] when `n` is
    /// outside `1..=buffer_size`.
    fn next_n(&self, n: i64) -> Result<i64>;

    /// Claim the next sequence without blocking.
    ///
    /// # Errors
    /// [`crate::disruptor::DisruptorError::InsufficientCapacity`] when the
    /// ring is full.
    fn try_next(&self) -> Result<i64>;

    /// Claim the next `n` sequences without blocking.
    ///
    /// # Errors
    /// As [`Sequenced::next_n`] plus
    /// [`crate::disruptor::DisruptorError::InsufficientCapacity`].
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Publish a claimed sequence once its slot is written.
    fn publish(&self, sequence: i64);

    /// Publish a whole claimed range once the slots are written.
    fn publish_range(&self, lo: i64, hi: i64);
}

/// Read-side access to the event stored at a sequence.
pub trait DataProvider<T>: Send + Sync {
    /// The event at `sequence`.
    fn get(&self, sequence: i64) -> &T;

    /// Mutable access to the event at `sequence`.
    ///
    /// # Safety
    /// The caller must hold exclusive access to `sequence`: either a
    /// producer between claim and publish, or the one consumer a barrier
    /// has handed the sequence to.
    #[allow(clippy::mut_from_ref)]
    unsafe fn get_mut(&self, sequence: i64) -> &mut T;
}

/// Translator-based event publishing.
pub trait EventSink<T> {
    /// Claim a slot, run the translator over it, publish.
    ///
    /// # Errors
    /// Claim errors from [`Sequenced::next`].
    fn publish_event(&self, translator: &dyn EventTranslator<T>) -> Result<()>;

    /// Non-blocking [`EventSink::publish_event`].
    ///
    /// # Errors
    /// [`crate::disruptor::DisruptorError::InsufficientCapacity`] when the
    /// ring is full.
    fn try_publish_event(&self, translator: &dyn EventTranslator<T>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCursor(i64);

    impl Cursored for FixedCursor {
        fn get_cursor(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn test_cursored_trait_object() {
        let cursored: &dyn Cursored = &FixedCursor(42);
        assert_eq!(cursored.get_cursor(), 42);
    }
}
