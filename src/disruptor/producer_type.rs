//! Producer type selection.

/// Whether a disruptor is fed by one publishing thread or several.
///
/// The single-producer sequencer skips all producer-side coordination and
/// is the faster choice whenever single-threaded publishing can be
/// guaranteed; the multi-producer sequencer coordinates claims with CAS and
/// per-slot availability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerType {
    /// Exactly one thread publishes. Fastest, but publishing from a second
    /// thread is undefined behaviour at the protocol level.
    Single,

    /// Any number of threads publish concurrently.
    Multi,
}

impl ProducerType {
    /// Whether this is [`ProducerType::Single`].
    #[must_use]
    pub fn is_single(&self) -> bool {
        matches!(self, ProducerType::Single)
    }

    /// Whether this is [`ProducerType::Multi`].
    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(self, ProducerType::Multi)
    }
}

impl Default for ProducerType {
    /// Multi-producer: correct under any publishing pattern. Opt in to
    /// single-producer when the guarantee holds.
    fn default() -> Self {
        ProducerType::Multi
    }
}

impl std::fmt::Display for ProducerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProducerType::Single => write!(f, "single"),
            ProducerType::Multi => write!(f, "multi"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(ProducerType::Single.is_single());
        assert!(!ProducerType::Single.is_multi());
        assert!(ProducerType::Multi.is_multi());
    }

    #[test]
    fn test_default_is_multi() {
        assert_eq!(ProducerType::default(), ProducerType::Multi);
    }

    #[test]
    fn test_display() {
        assert_eq!(ProducerType::Single.to_string(), "single");
        assert_eq!(ProducerType::Multi.to_string(), "multi");
    }
}
