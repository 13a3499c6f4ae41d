use std::{
    sync::Arc,
    task::{
        Poll,
        Waker
    },
    time::{
        Duration,
        Instant
    }
};
use parking_lot::{Condvar, Mutex};

/// Work registered to run once the cell holds a value. It receives the cell itself so that it
/// never has to keep its own reference to it while waiting.
pub(crate) type Continuation<T> = Box<dyn FnOnce(&Arc<Cell<T>>) + Send + 'static>;

struct Slot<T> {
    ready: bool,
    value: Option<T>,
    continuation: Option<Continuation<T>>,
    waker: Option<Waker>,
}

/// Storage behind one promise/future pair.
///
/// The ready flag outlives the value: once a consumer took the value the cell still reports
/// ready, but a second take is a usage error.
pub(crate) struct Cell<T> {
    slot: Mutex<Slot<T>>,
    on_ready: Condvar,
}

impl<T> Cell<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                ready: false,
                value: None,
                continuation: None,
                waker: None,
            }),
            on_ready: Condvar::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.slot.lock().ready
    }

    /// Stores the value and releases everything waiting on it. A continuation attached
    /// earlier runs on this thread once the lock is released.
    pub fn write(self: &Arc<Self>, value: T) {
        let (continuation, waker) = {
            let mut slot = self.slot.lock();
            assert!(!slot.ready, "cl-stream: a value was written twice to the same promise");
            slot.value = Some(value);
            slot.ready = true;
            (slot.continuation.take(), slot.waker.take())
        };

        self.on_ready.notify_all();
        if let Some(waker) = waker { waker.wake(); }
        if let Some(continuation) = continuation { continuation(self); }
    }

    /// Registers `continuation`. If the value already exists it runs right away on this
    /// thread, otherwise the writer runs it.
    pub fn attach(self: &Arc<Self>, continuation: Continuation<T>) {
        {
            let mut slot = self.slot.lock();
            assert!(
                slot.continuation.is_none(),
                "cl-stream: only one continuation may be attached to a future"
            );
            if !slot.ready {
                slot.continuation = Some(continuation);
                return;
            }
        }
        continuation(self);
    }

    pub fn wait(&self) {
        let mut slot = self.slot.lock();
        while !slot.ready {
            self.on_ready.wait(&mut slot);
        }
    }

    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while !slot.ready {
            if self.on_ready.wait_until(&mut slot, deadline).timed_out() {
                return slot.ready;
            }
        }
        true
    }

    /// Blocks until ready and moves the value out.
    pub fn take(&self) -> T {
        let mut slot = self.slot.lock();
        while !slot.ready {
            self.on_ready.wait(&mut slot);
        }
        match slot.value.take() {
            Some(value) => value,
            None => panic!("cl-stream: the value of this future was already consumed"),
        }
    }

    pub fn poll_take(&self, waker: &Waker) -> Poll<T> {
        let mut slot = self.slot.lock();
        if !slot.ready {
            match &slot.waker {
                Some(current) if current.will_wake(waker) => {}
                _ => slot.waker = Some(waker.clone()),
            }
            return Poll::Pending;
        }
        match slot.value.take() {
            Some(value) => Poll::Ready(value),
            None => panic!("cl-stream: the value of this future was already consumed"),
        }
    }
}

impl<T: Clone> Cell<T> {
    /// Blocks until ready and copies the value out, leaving it for other readers.
    pub fn get_cloned(&self) -> T {
        let mut slot = self.slot.lock();
        while !slot.ready {
            self.on_ready.wait(&mut slot);
        }
        match &slot.value {
            Some(value) => value.clone(),
            None => panic!("cl-stream: the value of this shared future was moved out"),
        }
    }
}
