use std::{fmt, sync::Arc, time::Duration};

use super::cell::Cell;

/// A copyable reader of a value produced by a [`Promise`](super::Promise). Every copy
/// observes the same value and reads it by clone.
pub struct SharedFuture<T> {
    cell: Option<Arc<Cell<T>>>,
}

impl<T> SharedFuture<T> {
    pub(crate) fn from_cell(cell: Option<Arc<Cell<T>>>) -> Self {
        Self { cell }
    }

    fn cell(&self) -> &Cell<T> {
        match &self.cell {
            Some(cell) => cell.as_ref(),
            None => panic!("cl-stream: operation on an invalid shared future"),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.cell.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.cell().is_ready()
    }

    pub fn wait(&self) {
        self.cell().wait();
    }

    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.cell().wait_for(timeout)
    }
}

impl<T: Clone> SharedFuture<T> {
    /// Blocks until the value exists and returns a copy of it.
    pub fn get(&self) -> T {
        self.cell().get_cloned()
    }
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        Self { cell: self.cell.clone() }
    }
}

impl<T> Default for SharedFuture<T> {
    fn default() -> Self {
        Self { cell: None }
    }
}

impl<T> fmt::Debug for SharedFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFuture")
            .field("valid", &self.is_valid())
            .field("ready", &self.cell.as_ref().map(|c| c.is_ready()))
            .finish()
    }
}
