use std::{
    fmt,
    pin::Pin,
    sync::Arc,
    task::{
        Context,
        Poll
    },
    time::Duration
};

use crate::executor::{dispatch_or_run, Executor};
use super::{cell::Cell, Promise, SharedFuture};

/// The single reader of a value produced by a [`Promise`].
///
/// A default-constructed future is invalid, as is the one left behind by
/// [`take`](Future::take). Operations other than [`is_valid`](Future::is_valid) panic on an
/// invalid future.
pub struct Future<T> {
    cell: Option<Arc<Cell<T>>>,
}

impl<T> Future<T> {
    pub(crate) fn from_cell(cell: Arc<Cell<T>>) -> Self {
        Self { cell: Some(cell) }
    }

    fn cell(&self) -> &Arc<Cell<T>> {
        match &self.cell {
            Some(cell) => cell,
            None => panic!("cl-stream: operation on an invalid future"),
        }
    }

    fn into_cell(mut self) -> Arc<Cell<T>> {
        match self.cell.take() {
            Some(cell) => cell,
            None => panic!("cl-stream: operation on an invalid future"),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.cell.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.cell().is_ready()
    }

    /// Blocks until the value exists, then moves it out.
    pub fn get(self) -> T {
        self.into_cell().take()
    }

    pub fn wait(&self) {
        self.cell().wait();
    }

    /// Waits at most `timeout`. A `false` result leaves the future pending; the value may
    /// still arrive later.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.cell().wait_for(timeout)
    }

    /// Moves the future out, leaving an invalid one in its place.
    pub fn take(&mut self) -> Future<T> {
        std::mem::take(self)
    }

    /// Attaches `f` to the value. The returned future becomes ready once `f` returned.
    ///
    /// `f` runs on the thread that fulfills the promise, or right here if the value already
    /// exists. Use [`next_on`](Future::next_on) to always go through an executor.
    pub fn next<R, F>(self, f: F) -> Future<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        let mut promise = Promise::new();
        let future = promise.get_future();

        self.into_cell().attach(Box::new(move |cell: &Arc<Cell<T>>| {
            let value = cell.take();
            promise.set_value(f(value));
        }));

        future
    }

    /// Like [`next`](Future::next), but `f` receives the ready future itself and decides when
    /// to consume it.
    pub fn then<R, F>(self, f: F) -> Future<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: FnOnce(Future<T>) -> R + Send + 'static,
    {
        let mut promise = Promise::new();
        let future = promise.get_future();

        self.into_cell().attach(Box::new(move |cell: &Arc<Cell<T>>| {
            let source = Future::from_cell(Arc::clone(cell));
            promise.set_value(f(source));
        }));

        future
    }

    /// Attaches `f` to the value and always runs it as work dispatched on `executor`, even if
    /// the value already exists.
    pub fn next_on<E, R, F>(self, executor: E, f: F) -> Future<R>
    where
        E: Executor + 'static,
        T: Send + 'static,
        R: Send + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        let mut promise = Promise::new();
        let future = promise.get_future();

        self.into_cell().attach(Box::new(move |cell: &Arc<Cell<T>>| {
            let cell = Arc::clone(cell);
            dispatch_or_run(&executor, move || {
                let value = cell.take();
                promise.set_value(f(value));
            });
        }));

        future
    }

    /// Dispatched counterpart of [`then`](Future::then).
    pub fn then_on<E, R, F>(self, executor: E, f: F) -> Future<R>
    where
        E: Executor + 'static,
        T: Send + 'static,
        R: Send + 'static,
        F: FnOnce(Future<T>) -> R + Send + 'static,
    {
        let mut promise = Promise::new();
        let future = promise.get_future();

        self.into_cell().attach(Box::new(move |cell: &Arc<Cell<T>>| {
            let source = Future::from_cell(Arc::clone(cell));
            dispatch_or_run(&executor, move || {
                promise.set_value(f(source));
            });
        }));

        future
    }
}

impl<T: Clone> Future<T> {
    /// Converts into a future any number of readers can copy the value out of.
    pub fn share(self) -> SharedFuture<T> {
        SharedFuture::from(self)
    }
}

impl<T> Default for Future<T> {
    fn default() -> Self {
        Self { cell: None }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("valid", &self.is_valid())
            .field("ready", &self.cell.as_ref().map(|c| c.is_ready()))
            .finish()
    }
}

impl<T> From<Future<T>> for SharedFuture<T> {
    fn from(future: Future<T>) -> Self {
        SharedFuture::from_cell(future.cell)
    }
}

impl<T> std::future::Future for Future<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.as_mut().get_mut();

        let poll = this.cell().poll_take(cx.waker());
        if poll.is_ready() {
            this.cell = None;
        }
        poll
    }
}
