use std::{
    fmt,
    sync::atomic::{
        AtomicUsize,
        Ordering
    }
};

/// The kind of caller holding a reference on a file state. Each origin keeps its own count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationOrigin {
    Loading,
    Streaming,
}

impl fmt::Display for OperationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationOrigin::Loading => write!(f, "Loading"),
            OperationOrigin::Streaming => write!(f, "Streaming"),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct OriginCounts {
    loading: AtomicUsize,
    streaming: AtomicUsize,
}

impl OriginCounts {
    fn counter(&self, origin: OperationOrigin) -> &AtomicUsize {
        match origin {
            OperationOrigin::Loading => &self.loading,
            OperationOrigin::Streaming => &self.streaming,
        }
    }

    pub fn get(&self, origin: OperationOrigin) -> usize {
        self.counter(origin).load(Ordering::Acquire)
    }

    pub fn total(&self) -> usize {
        self.get(OperationOrigin::Loading) + self.get(OperationOrigin::Streaming)
    }

    pub fn increment(&self, origin: OperationOrigin) -> usize {
        self.counter(origin).fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the new count, or `None` when the count already was zero.
    pub fn decrement(&self, origin: OperationOrigin) -> Option<usize> {
        self.counter(origin)
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
            .ok()
            .map(|previous| previous - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_count_independently() {
        let counts = OriginCounts::default();
        counts.increment(OperationOrigin::Loading);
        counts.increment(OperationOrigin::Loading);
        counts.increment(OperationOrigin::Streaming);

        assert_eq!(counts.get(OperationOrigin::Loading), 2);
        assert_eq!(counts.get(OperationOrigin::Streaming), 1);
        assert_eq!(counts.total(), 3);

        assert_eq!(counts.decrement(OperationOrigin::Streaming), Some(0));
        assert_eq!(counts.decrement(OperationOrigin::Streaming), None);
        assert_eq!(counts.total(), 2);
    }
}
