//! Property-based tests over the sequencing primitives.

use std::sync::Arc;

use proptest::prelude::*;

use crate::disruptor::{
    BusySpinWaitStrategy, Cursored, DataProvider, DefaultEventFactory, MultiProducerSequencer,
    RingBuffer, Sequence, Sequencer, SingleProducerSequencer,
};

mod sequence_properties {
    use super::*;

    proptest! {
        #[test]
        fn get_returns_last_set(value in any::<i64>()) {
            let seq = Sequence::new(0);
            seq.set(value);
            prop_assert_eq!(seq.get(), value);
        }

        #[test]
        fn add_and_get_is_consistent(
            initial in -1_000_000i64..1_000_000,
            delta in 1i64..1000,
        ) {
            let seq = Sequence::new(initial);
            prop_assert_eq!(seq.add_and_get(delta), initial + delta);
            prop_assert_eq!(seq.get(), initial + delta);
        }

        #[test]
        fn compare_and_set_succeeds_on_expected(
            initial in any::<i64>(),
            new_value in any::<i64>(),
        ) {
            let seq = Sequence::new(initial);
            prop_assert!(seq.compare_and_set(initial, new_value));
            prop_assert_eq!(seq.get(), new_value);
        }

        #[test]
        fn compare_and_set_fails_on_mismatch(
            initial in any::<i64>(),
            wrong in any::<i64>(),
            new_value in any::<i64>(),
        ) {
            prop_assume!(wrong != initial);
            let seq = Sequence::new(initial);
            prop_assert!(!seq.compare_and_set(wrong, new_value));
            prop_assert_eq!(seq.get(), initial);
        }

        #[test]
        fn minimum_respects_floor(
            values in prop::collection::vec(-1000i64..1000, 0..8),
            floor in -1000i64..1000,
        ) {
            let sequences: Vec<Arc<Sequence>> =
                values.iter().map(|v| Arc::new(Sequence::new(*v))).collect();
            let minimum = Sequence::get_minimum_sequence(&sequences, floor);

            prop_assert!(minimum <= floor);
            for v in &values {
                prop_assert!(minimum <= *v);
            }
            prop_assert!(values.iter().copied().chain([floor]).any(|v| v == minimum));
        }
    }
}

mod ring_buffer_properties {
    use super::*;

    proptest! {
        #[test]
        fn slot_mapping_wraps_by_capacity(
            size_power in 1u32..10,
            sequence in 0i64..1_000_000,
            value in any::<i64>(),
        ) {
            let size = 1usize << size_power;
            let factory = DefaultEventFactory::<i64>::new();
            let buffer = RingBuffer::with_single_producer(
                &factory,
                size,
                Arc::new(BusySpinWaitStrategy::new()),
            ).unwrap();

            // SAFETY: single-threaded test, no concurrent slot access.
            unsafe { *DataProvider::get_mut(&buffer, sequence) = value };

            prop_assert_eq!(*buffer.get(sequence), value);
            prop_assert_eq!(*buffer.get(sequence + size as i64), value);
            prop_assert_eq!(*buffer.get(sequence % size as i64), value);
        }
    }
}

mod sequencer_properties {
    use super::*;

    proptest! {
        /// Wrap prevention: with a stuck consumer, exactly `buffer_size`
        /// claims succeed and no more.
        #[test]
        fn capacity_is_exactly_buffer_size(size_power in 1u32..10) {
            let size = 1usize << size_power;
            let sequencer =
                SingleProducerSequencer::new(size, Arc::new(BusySpinWaitStrategy::new()));
            let gate = Arc::new(Sequence::default());
            sequencer.add_gating_sequences(&[Arc::clone(&gate)]);

            let mut claims = 0usize;
            while let Ok(sequence) = sequencer.try_next() {
                sequencer.publish(sequence);
                claims += 1;
                prop_assert!(claims <= size);
            }
            prop_assert_eq!(claims, size);
            prop_assert_eq!(sequencer.remaining_capacity(), 0);
        }

        /// Every slot the consumer frees becomes claimable again, and the
        /// producer never runs more than `buffer_size` ahead of the gate.
        #[test]
        fn freed_slots_restore_capacity(
            size_power in 1u32..8,
            advance_by in 1i64..64,
        ) {
            let size = 1usize << size_power;
            let sequencer =
                SingleProducerSequencer::new(size, Arc::new(BusySpinWaitStrategy::new()));
            let gate = Arc::new(Sequence::default());
            sequencer.add_gating_sequences(&[Arc::clone(&gate)]);

            while let Ok(sequence) = sequencer.try_next() {
                sequencer.publish(sequence);
            }

            let advance = advance_by.min(size as i64 - 1);
            gate.set(advance);

            let mut extra = 0i64;
            while let Ok(sequence) = sequencer.try_next() {
                sequencer.publish(sequence);
                extra += 1;
                prop_assert!(sequencer.get_cursor() - gate.get() <= size as i64);
            }
            prop_assert_eq!(extra, advance + 1);
        }

        /// The consumer-visible prefix is exactly the run of published
        /// sequences before the first gap.
        #[test]
        fn published_prefix_stops_at_first_gap(
            size_power in 2u32..8,
            publish_mask in any::<u64>(),
        ) {
            let size = 1usize << size_power;
            let sequencer = MultiProducerSequencer::new(
                size,
                Arc::new(BusySpinWaitStrategy::new()),
            ).unwrap();

            let hi = sequencer.next_n(size as i64).unwrap();
            prop_assert_eq!(hi, size as i64 - 1);

            let mut first_gap = size as i64;
            for sequence in 0..size as i64 {
                if publish_mask & (1u64 << (sequence as u64 % 64)) != 0 {
                    sequencer.publish(sequence);
                } else if sequence < first_gap {
                    first_gap = sequence;
                }
            }

            let highest = sequencer.get_highest_published_sequence(0, hi);
            prop_assert_eq!(highest, first_gap - 1);

            for sequence in 0..=highest {
                prop_assert!(sequencer.is_available(sequence));
            }
        }
    }
}
