//! Sequence counter used for coordination between producers and consumers.
//!
//! A [`Sequence`] is not a general-purpose atomic: it is a release-publish /
//! acquire-observe counter with CAS. A producer's slot writes happen-before
//! its release publish of the cursor; a consumer's acquire read of the cursor
//! happens-before its slot reads. The value is padded out to a full cache
//! line so neighbouring allocations cannot false-share with it.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::disruptor::INITIAL_CURSOR_VALUE;

/// Cache line size the padding targets.
const CACHE_LINE_SIZE: usize = 64;

/// A cache-line-isolated, atomically mutable sequence counter.
///
/// Starts at [`INITIAL_CURSOR_VALUE`] (−1) by default. Each sequence has
/// exactly one writer (the owning producer or consumer) and any number of
/// readers; values written through [`set`](Self::set) are monotonically
/// non-decreasing for the lifetime of the counter.
#[repr(align(64))]
pub struct Sequence {
    value: AtomicI64,
    _padding: [u8; CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>()],
}

const _: () = assert!(std::mem::align_of::<Sequence>() >= CACHE_LINE_SIZE);
const _: () = assert!(std::mem::size_of::<Sequence>() >= CACHE_LINE_SIZE);

impl Sequence {
    /// Create a sequence with the given initial value.
    #[must_use]
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: AtomicI64::new(initial_value),
            _padding: [0; CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>()],
        }
    }

    /// Read the current value (acquire).
    ///
    /// An acquire read observes every write that happened-before the
    /// matching release [`set`](Self::set).
    #[inline]
    #[must_use]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Write a new value (release), publishing all prior writes with it.
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Write a new value with a full StoreLoad barrier behind it.
    #[inline]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Atomically set the value to `new` if the current value is `expected`.
    ///
    /// Returns `true` on success. Uses a strong exchange so callers may rely
    /// on a `false` result meaning another writer really got there first.
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Atomically add `increment` and return the new value.
    #[inline]
    pub fn add_and_get(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel) + increment
    }

    /// Atomically add `increment` and return the previous value.
    #[inline]
    pub fn get_and_add(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel)
    }

    /// Atomically increment and return the new value.
    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Atomically increment and return the previous value.
    #[inline]
    pub fn get_and_increment(&self) -> i64 {
        self.get_and_add(1)
    }

    /// The minimum over `sequences`, floored at `minimum`.
    ///
    /// Producers pass their own position as the floor so an empty gating set
    /// never reports more capacity than the producer itself has consumed.
    #[must_use]
    pub fn get_minimum_sequence(sequences: &[Arc<Sequence>], minimum: i64) -> i64 {
        sequences.iter().map(|s| s.get()).fold(minimum, i64::min)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence").field("value", &self.get()).finish()
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}
