use std::sync::Arc;

use super::{cell::Cell, Future};

/// The single obligation to produce one value for the [`Future`] handed out by
/// [`get_future`](Promise::get_future).
pub struct Promise<T> {
    cell: Arc<Cell<T>>,
    future_retrieved: bool,
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Cell::new()),
            future_retrieved: false,
        }
    }

    /// Returns the future bound to this promise. May only be called once.
    pub fn get_future(&mut self) -> Future<T> {
        assert!(
            !self.future_retrieved,
            "cl-stream: get_future was called twice on the same promise"
        );
        self.future_retrieved = true;
        Future::from_cell(Arc::clone(&self.cell))
    }

    /// Fulfills the promise. Continuations attached to the future run on this thread before
    /// this call returns. Writing twice panics.
    pub fn set_value(&mut self, value: T) {
        self.cell.write(value);
    }

    /// Fulfills the promise with anything convertible into `T`.
    pub fn emplace_value<V: Into<T>>(&mut self, value: V) {
        self.set_value(value.into());
    }

    pub fn is_fulfilled(&self) -> bool {
        self.cell.is_ready()
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if self.future_retrieved && !self.cell.is_ready() {
            warn!("cl-stream: Promise dropped without a value; its future will never become ready");
        }
    }
}

/// Returns a future that already holds `value`.
pub fn make_ready_future<T>(value: T) -> Future<T> {
    let mut promise = Promise::new();
    promise.set_value(value);
    promise.get_future()
}
