//! Wait strategies: how a consumer suspends until a sequence is reachable.
//!
//! All variants implement one contract and differ only in how they burn (or
//! give up) CPU while the target sequence is not yet visible. Each variant
//! re-checks the barrier's alert flag on every iteration so a blocked
//! consumer can always be interrupted by [`SequenceBarrier::alert`].

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::disruptor::{DisruptorError, Result, Sequence, SequenceBarrier};

/// Policy for blocking a consumer until a target sequence becomes visible.
pub trait WaitStrategy: Send + Sync + std::fmt::Debug {
    /// Wait until `min(cursor, min(dependent_sequences))` reaches `sequence`.
    ///
    /// Returns the observed minimum once it is `>= sequence` (it may be
    /// higher than requested). Fails with [`DisruptorError::Alert`] if the
    /// barrier is alerted while waiting, or [`DisruptorError::Timeout`] from
    /// deadline-capable variants.
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64>;

    /// Wake any consumers blocked in [`wait_for`](Self::wait_for).
    ///
    /// Sequencers call this after every publish. No-op for strategies that
    /// never sleep on a condition variable.
    fn signal_all_when_blocking(&self);
}

/// Highest visible sequence from the cursor and the dependent set.
#[inline]
fn observed_minimum(cursor: &Sequence, dependent_sequences: &[Arc<Sequence>]) -> i64 {
    Sequence::get_minimum_sequence(dependent_sequences, cursor.get())
}

/// Hot-loop strategy: lowest latency, one core pegged per waiting consumer.
#[derive(Debug, Default)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    /// Create a new busy-spin wait strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut available_sequence;
        while {
            available_sequence = observed_minimum(cursor, dependent_sequences);
            available_sequence < sequence
        } {
            barrier.check_alert()?;
            std::hint::spin_loop();
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {}
}

/// Spin a bounded number of times, then hand the CPU off on every iteration.
#[derive(Debug, Default)]
pub struct YieldingWaitStrategy;

const YIELD_SPIN_TRIES: u32 = 100;

impl YieldingWaitStrategy {
    /// Create a new yielding wait strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = YIELD_SPIN_TRIES;
        let mut available_sequence;

        while {
            available_sequence = observed_minimum(cursor, dependent_sequences);
            available_sequence < sequence
        } {
            barrier.check_alert()?;
            if counter == 0 {
                thread::yield_now();
            } else {
                counter -= 1;
                std::hint::spin_loop();
            }
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {}
}

/// Spin, then yield, then park for a fixed interval.
///
/// A good compromise between latency and CPU use; latency spikes are
/// possible after quiet periods. The producer side stays signal-free.
#[derive(Debug)]
pub struct SleepingWaitStrategy {
    retries: u32,
    sleep: Duration,
}

const SLEEP_DEFAULT_RETRIES: u32 = 200;
const SLEEP_DEFAULT_INTERVAL: Duration = Duration::from_nanos(100);

impl SleepingWaitStrategy {
    /// Create a sleeping wait strategy with the default retry ladder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            retries: SLEEP_DEFAULT_RETRIES,
            sleep: SLEEP_DEFAULT_INTERVAL,
        }
    }

    /// Override the number of spin/yield retries before parking.
    #[must_use]
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            sleep: SLEEP_DEFAULT_INTERVAL,
        }
    }

    /// Override both the retry count and the park interval.
    #[must_use]
    pub fn with_retries_and_interval(retries: u32, sleep: Duration) -> Self {
        Self { retries, sleep }
    }

    fn apply_wait_method(&self, barrier: &dyn SequenceBarrier, counter: u32) -> Result<u32> {
        barrier.check_alert()?;

        if counter > 100 {
            Ok(counter - 1)
        } else if counter > 0 {
            thread::yield_now();
            Ok(counter - 1)
        } else {
            thread::park_timeout(self.sleep);
            Ok(0)
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.retries;
        let mut available_sequence;

        while {
            available_sequence = observed_minimum(cursor, dependent_sequences);
            available_sequence < sequence
        } {
            counter = self.apply_wait_method(barrier, counter)?;
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {}
}

/// Mutex + condition variable strategy: minimal CPU, producer signals on
/// every publish.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    guard: Mutex<()>,
    condvar: Condvar,
}

impl BlockingWaitStrategy {
    /// Create a new blocking wait strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.guard.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                self.condvar.wait(&mut guard);
            }
        }

        // The cursor is there; dependent consumers are close behind. Spin the
        // last stretch rather than bouncing on the lock.
        let mut available_sequence;
        while {
            available_sequence = observed_minimum(cursor, dependent_sequences);
            available_sequence < sequence
        } {
            barrier.check_alert()?;
            std::hint::spin_loop();
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        // Taking the lock pairs with the waiter's check-then-wait, so a
        // publish between the check and the wait cannot be lost.
        let _guard = self.guard.lock();
        self.condvar.notify_all();
    }
}

/// As [`BlockingWaitStrategy`], but gives up after a deadline.
///
/// The processor treats the resulting [`DisruptorError::Timeout`] as a
/// notification (the handler's `on_timeout` hook), not as a failure.
#[derive(Debug)]
pub struct TimeoutBlockingWaitStrategy {
    guard: Mutex<()>,
    condvar: Condvar,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    /// Create a timeout-blocking wait strategy with the given deadline per
    /// wait.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            guard: Mutex::new(()),
            condvar: Condvar::new(),
            timeout,
        }
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let deadline = Instant::now() + self.timeout;
            let mut guard = self.guard.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                if self.condvar.wait_until(&mut guard, deadline).timed_out()
                    && cursor.get() < sequence
                {
                    return Err(DisruptorError::Timeout);
                }
            }
        }

        let mut available_sequence;
        while {
            available_sequence = observed_minimum(cursor, dependent_sequences);
            available_sequence < sequence
        } {
            barrier.check_alert()?;
            std::hint::spin_loop();
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.guard.lock();
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::{Sequencer, SingleProducerSequencer};

    fn barrier_for(
        strategy: Arc<dyn WaitStrategy>,
    ) -> Arc<dyn SequenceBarrier> {
        let sequencer = Arc::new(SingleProducerSequencer::new(16, strategy));
        sequencer.new_barrier(vec![])
    }

    fn assert_returns_available(strategy: impl WaitStrategy + 'static) {
        let strategy = Arc::new(strategy);
        let barrier = barrier_for(strategy.clone());
        let cursor = Sequence::new(10);

        let available = strategy
            .wait_for(5, &cursor, &[], barrier.as_ref())
            .unwrap();
        assert_eq!(available, 10);
    }

    #[test]
    fn test_busy_spin_returns_when_available() {
        assert_returns_available(BusySpinWaitStrategy::new());
    }

    #[test]
    fn test_yielding_returns_when_available() {
        assert_returns_available(YieldingWaitStrategy::new());
    }

    #[test]
    fn test_sleeping_returns_when_available() {
        assert_returns_available(SleepingWaitStrategy::with_retries(10));
    }

    #[test]
    fn test_blocking_returns_when_available() {
        assert_returns_available(BlockingWaitStrategy::new());
    }

    #[test]
    fn test_dependent_sequences_cap_the_result() {
        let strategy = Arc::new(BusySpinWaitStrategy::new());
        let barrier = barrier_for(strategy.clone());
        let cursor = Sequence::new(20);
        let dependents = vec![Arc::new(Sequence::new(12))];

        let available = strategy
            .wait_for(5, &cursor, &dependents, barrier.as_ref())
            .unwrap();
        assert_eq!(available, 12);
    }

    #[test]
    fn test_alert_interrupts_wait() {
        let strategy = Arc::new(YieldingWaitStrategy::new());
        let barrier = barrier_for(strategy.clone());
        barrier.alert();

        let cursor = Sequence::new(0);
        let result = strategy.wait_for(5, &cursor, &[], barrier.as_ref());
        assert!(matches!(result, Err(DisruptorError::Alert)));
    }

    #[test]
    fn test_timeout_blocking_times_out() {
        let strategy = Arc::new(TimeoutBlockingWaitStrategy::new(Duration::from_millis(5)));
        let barrier = barrier_for(strategy.clone());
        let cursor = Sequence::new(0);

        let started = Instant::now();
        let result = strategy.wait_for(5, &cursor, &[], barrier.as_ref());
        assert!(matches!(result, Err(DisruptorError::Timeout)));
        assert!(started.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_blocking_wakes_on_signal() {
        let strategy = Arc::new(BlockingWaitStrategy::new());
        let barrier = barrier_for(strategy.clone());
        let cursor = Arc::new(Sequence::default());

        let waiter = {
            let strategy = Arc::clone(&strategy);
            let barrier = Arc::clone(&barrier);
            let cursor = Arc::clone(&cursor);
            thread::spawn(move || strategy.wait_for(0, &cursor, &[], barrier.as_ref()))
        };

        thread::sleep(Duration::from_millis(10));
        cursor.set(0);
        strategy.signal_all_when_blocking();

        assert_eq!(waiter.join().unwrap().unwrap(), 0);
    }
}
