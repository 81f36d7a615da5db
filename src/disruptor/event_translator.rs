//! Event translators: filling a claimed slot with data.
//!
//! A translator receives the pre-allocated event and the claimed sequence
//! and writes the payload in place. The arity variants exist so call sites
//! can pass data without building an intermediate struct per publish.

/// Write a payload into a claimed event.
pub trait EventTranslator<T>: Send + Sync {
    /// Populate `event`, already resident in the ring, for `sequence`.
    fn translate_to(&self, event: &mut T, sequence: i64);
}

/// [`EventTranslator`] carrying one extra argument.
pub trait EventTranslatorOneArg<T, A>: Send + Sync {
    /// Populate `event` from `arg0`.
    fn translate_to(&self, event: &mut T, sequence: i64, arg0: A);
}

/// [`EventTranslator`] carrying two extra arguments.
pub trait EventTranslatorTwoArg<T, A, B>: Send + Sync {
    /// Populate `event` from `arg0` and `arg1`.
    fn translate_to(&self, event: &mut T, sequence: i64, arg0: A, arg1: B);
}

/// [`EventTranslator`] carrying three extra arguments.
pub trait EventTranslatorThreeArg<T, A, B, C>: Send + Sync {
    /// Populate `event` from `arg0`, `arg1` and `arg2`.
    fn translate_to(&self, event: &mut T, sequence: i64, arg0: A, arg1: B, arg2: C);
}

/// Closure-backed [`EventTranslator`].
pub struct ClosureEventTranslator<T, F>
where
    F: Fn(&mut T, i64) + Send + Sync,
{
    translator_fn: F,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, F> ClosureEventTranslator<T, F>
where
    F: Fn(&mut T, i64) + Send + Sync,
{
    /// Wrap `translator_fn` as an [`EventTranslator`].
    pub fn new(translator_fn: F) -> Self {
        Self {
            translator_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> EventTranslator<T> for ClosureEventTranslator<T, F>
where
    T: Send + Sync,
    F: Fn(&mut T, i64) + Send + Sync,
{
    fn translate_to(&self, event: &mut T, sequence: i64) {
        (self.translator_fn)(event, sequence);
    }
}

/// Closure-backed [`EventTranslatorOneArg`].
pub struct ClosureEventTranslatorOneArg<T, A, F>
where
    F: Fn(&mut T, i64, A) + Send + Sync,
{
    translator_fn: F,
    _phantom: std::marker::PhantomData<(T, A)>,
}

impl<T, A, F> ClosureEventTranslatorOneArg<T, A, F>
where
    F: Fn(&mut T, i64, A) + Send + Sync,
{
    /// Wrap `translator_fn` as an [`EventTranslatorOneArg`].
    pub fn new(translator_fn: F) -> Self {
        Self {
            translator_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, A, F> EventTranslatorOneArg<T, A> for ClosureEventTranslatorOneArg<T, A, F>
where
    T: Send + Sync,
    A: Send + Sync,
    F: Fn(&mut T, i64, A) + Send + Sync,
{
    fn translate_to(&self, event: &mut T, sequence: i64, arg0: A) {
        (self.translator_fn)(event, sequence, arg0);
    }
}

/// Closure-backed [`EventTranslatorTwoArg`].
pub struct ClosureEventTranslatorTwoArg<T, A, B, F>
where
    F: Fn(&mut T, i64, A, B) + Send + Sync,
{
    translator_fn: F,
    _phantom: std::marker::PhantomData<(T, A, B)>,
}

impl<T, A, B, F> ClosureEventTranslatorTwoArg<T, A, B, F>
where
    F: Fn(&mut T, i64, A, B) + Send + Sync,
{
    /// Wrap `translator_fn` as an [`EventTranslatorTwoArg`].
    pub fn new(translator_fn: F) -> Self {
        Self {
            translator_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, A, B, F> EventTranslatorTwoArg<T, A, B> for ClosureEventTranslatorTwoArg<T, A, B, F>
where
    T: Send + Sync,
    A: Send + Sync,
    B: Send + Sync,
    F: Fn(&mut T, i64, A, B) + Send + Sync,
{
    fn translate_to(&self, event: &mut T, sequence: i64, arg0: A, arg1: B) {
        (self.translator_fn)(event, sequence, arg0, arg1);
    }
}

/// Build an [`EventTranslator`] from a closure.
pub fn event_translator<T, F>(translator_fn: F) -> ClosureEventTranslator<T, F>
where
    F: Fn(&mut T, i64) + Send + Sync,
{
    ClosureEventTranslator::new(translator_fn)
}

/// Build an [`EventTranslatorOneArg`] from a closure.
pub fn event_translator_one_arg<T, A, F>(translator_fn: F) -> ClosureEventTranslatorOneArg<T, A, F>
where
    F: Fn(&mut T, i64, A) + Send + Sync,
{
    ClosureEventTranslatorOneArg::new(translator_fn)
}

/// Build an [`EventTranslatorTwoArg`] from a closure.
pub fn event_translator_two_arg<T, A, B, F>(
    translator_fn: F,
) -> ClosureEventTranslatorTwoArg<T, A, B, F>
where
    F: Fn(&mut T, i64, A, B) + Send + Sync,
{
    ClosureEventTranslatorTwoArg::new(translator_fn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct TestEvent {
        value: i64,
        label: String,
    }

    #[test]
    fn test_closure_translator() {
        let translator = event_translator(|event: &mut TestEvent, sequence| {
            event.value = sequence;
        });

        let mut event = TestEvent::default();
        translator.translate_to(&mut event, 42);
        assert_eq!(event.value, 42);
    }

    #[test]
    fn test_one_arg_translator() {
        let translator =
            event_translator_one_arg(|event: &mut TestEvent, sequence, label: String| {
                event.value = sequence;
                event.label = label;
            });

        let mut event = TestEvent::default();
        translator.translate_to(&mut event, 3, "tick".to_string());
        assert_eq!(event.value, 3);
        assert_eq!(event.label, "tick");
    }

    #[test]
    fn test_two_arg_translator() {
        let translator = event_translator_two_arg(
            |event: &mut TestEvent, _sequence, value: i64, label: String| {
                event.value = value;
                event.label = label;
            },
        );

        let mut event = TestEvent::default();
        translator.translate_to(&mut event, 0, 7, "seven".to_string());
        assert_eq!(event.value, 7);
        assert_eq!(event.label, "seven");
    }
}
