//! Sequence barriers: the consumer-facing gate onto the ring.
//!
//! A barrier ties together the producer cursor, the sequences of any
//! upstream consumers this consumer depends on, and the wait strategy. It is
//! also the carrier of the alert flag used for cooperative shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::disruptor::{DisruptorError, Result, Sequence, Sequencer, WaitStrategy};

/// Coordination point a consumer waits on before reading slots.
pub trait SequenceBarrier: Send + Sync {
    /// Wait for `sequence` to become safely readable.
    ///
    /// Returns the highest sequence that may be processed, which can exceed
    /// the request. For out-of-order publishers the result is capped to the
    /// contiguous published prefix, so no unpublished slot is ever exposed.
    ///
    /// # Errors
    /// [`DisruptorError::Alert`] when alerted, [`DisruptorError::Timeout`]
    /// when the wait strategy enforces a deadline.
    fn wait_for(&self, sequence: i64) -> Result<i64>;

    /// Current value of the cursor this barrier tracks.
    fn get_cursor(&self) -> i64;

    /// Whether the barrier is in the alerted state.
    fn is_alerted(&self) -> bool;

    /// Alert the barrier, waking and interrupting any waiting consumer.
    fn alert(&self);

    /// Clear the alert state so the barrier can be waited on again.
    fn clear_alert(&self);

    /// Fail with [`DisruptorError::Alert`] if the barrier is alerted.
    ///
    /// # Errors
    /// [`DisruptorError::Alert`] when the alert flag is set.
    fn check_alert(&self) -> Result<()>;
}

/// Barrier over a sequencer's cursor and a fixed set of dependent sequences.
///
/// Created through [`Sequencer::new_barrier`]; holds the sequencer so the
/// wait result can be capped with
/// [`Sequencer::get_highest_published_sequence`].
pub struct ProcessingSequenceBarrier {
    cursor: Arc<Sequence>,
    wait_strategy: Arc<dyn WaitStrategy>,
    dependent_sequences: Vec<Arc<Sequence>>,
    alerted: AtomicBool,
    sequencer: Arc<dyn Sequencer>,
}

impl ProcessingSequenceBarrier {
    /// Create a barrier gated by `cursor` and `dependent_sequences`.
    pub fn new(
        cursor: Arc<Sequence>,
        wait_strategy: Arc<dyn WaitStrategy>,
        dependent_sequences: Vec<Arc<Sequence>>,
        sequencer: Arc<dyn Sequencer>,
    ) -> Self {
        Self {
            cursor,
            wait_strategy,
            dependent_sequences,
            alerted: AtomicBool::new(false),
            sequencer,
        }
    }
}

impl SequenceBarrier for ProcessingSequenceBarrier {
    fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;

        let available_sequence = self.wait_strategy.wait_for(
            sequence,
            &self.cursor,
            &self.dependent_sequences,
            self,
        )?;

        if available_sequence < sequence {
            return Ok(available_sequence);
        }

        // With multiple producers the cursor races ahead of the published
        // frontier, so only the contiguous prefix may be handed out.
        Ok(self
            .sequencer
            .get_highest_published_sequence(sequence, available_sequence))
    }

    fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }

    fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    fn alert(&self) {
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            Err(DisruptorError::Alert)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for ProcessingSequenceBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingSequenceBarrier")
            .field("cursor", &self.cursor)
            .field("dependent_sequences", &self.dependent_sequences)
            .field("alerted", &self.is_alerted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::{
        BlockingWaitStrategy, MultiProducerSequencer, SingleProducerSequencer,
    };

    fn single_producer_barrier(
        buffer_size: usize,
    ) -> (Arc<SingleProducerSequencer>, Arc<dyn SequenceBarrier>) {
        let wait_strategy = Arc::new(BlockingWaitStrategy::new());
        let sequencer = Arc::new(SingleProducerSequencer::new(buffer_size, wait_strategy));
        let barrier = Arc::clone(&sequencer).new_barrier(vec![]);
        (sequencer, barrier)
    }

    #[test]
    fn test_wait_for_published_sequence() {
        let (sequencer, barrier) = single_producer_barrier(16);

        for _ in 0..4 {
            let sequence = sequencer.next().unwrap();
            sequencer.publish(sequence);
        }

        assert_eq!(barrier.wait_for(3).unwrap(), 3);
        assert_eq!(barrier.get_cursor(), 3);
    }

    #[test]
    fn test_alert_lifecycle() {
        let (_sequencer, barrier) = single_producer_barrier(16);

        assert!(!barrier.is_alerted());
        assert!(barrier.check_alert().is_ok());

        barrier.alert();
        assert!(barrier.is_alerted());
        assert!(matches!(barrier.check_alert(), Err(DisruptorError::Alert)));
        assert!(matches!(barrier.wait_for(0), Err(DisruptorError::Alert)));

        barrier.clear_alert();
        assert!(!barrier.is_alerted());
        assert!(barrier.check_alert().is_ok());
    }

    #[test]
    fn test_multi_producer_gap_is_not_exposed() {
        let wait_strategy = Arc::new(BlockingWaitStrategy::new());
        let sequencer = Arc::new(MultiProducerSequencer::new(16, wait_strategy).unwrap());
        let barrier = Arc::clone(&sequencer).new_barrier(vec![]);

        // Claim 0..=3 but leave a hole at 1.
        for _ in 0..4 {
            sequencer.next().unwrap();
        }
        sequencer.publish(0);
        sequencer.publish(2);
        sequencer.publish(3);

        assert_eq!(barrier.wait_for(0).unwrap(), 0);

        sequencer.publish(1);
        assert_eq!(barrier.wait_for(0).unwrap(), 3);
    }

    #[test]
    fn test_dependent_sequence_gates_barrier() {
        let wait_strategy = Arc::new(BlockingWaitStrategy::new());
        let sequencer = Arc::new(SingleProducerSequencer::new(16, wait_strategy));
        let upstream = Arc::new(Sequence::new(5));
        let barrier = Arc::clone(&sequencer).new_barrier(vec![Arc::clone(&upstream)]);

        for _ in 0..10 {
            let sequence = sequencer.next().unwrap();
            sequencer.publish(sequence);
        }

        // Cursor is at 9 but the upstream consumer has only reached 5.
        assert_eq!(barrier.wait_for(3).unwrap(), 5);

        upstream.set(8);
        assert_eq!(barrier.wait_for(6).unwrap(), 8);
    }
}
