use std::{
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{
            AtomicU8,
            Ordering
        },
        Arc
    }
};
use parking_lot::Mutex;

use crate::executor::{dispatch_or_run, worker::panic_message, Executor};

/// A queued operation. It holds the execution slot until the [`OperationDone`] it receives is
/// completed or dropped, which may happen long after the operation itself returned.
pub(crate) type Operation = Box<dyn FnOnce(OperationDone) + Send + 'static>;

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const DETACHED: u8 = 2;

struct QueueInner {
    operations: VecDeque<Operation>,
    running: bool,
}

/// Runs operations one at a time, in push order, on an executor.
///
/// Operations that complete before returning let the current drain keep going. An operation
/// that completes later re-dispatches the drain from whichever thread completed it.
pub(crate) struct ExecutionQueue {
    inner: Mutex<QueueInner>,
    executor: Arc<dyn Executor>,
}

impl ExecutionQueue {
    pub fn new(executor: Arc<dyn Executor>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(QueueInner {
                operations: VecDeque::new(),
                running: false,
            }),
            executor,
        })
    }

    pub fn push(self: &Arc<Self>, operation: Operation) {
        {
            let mut inner = self.inner.lock();
            inner.operations.push_back(operation);
            if inner.running { return }
            inner.running = true;
        }
        self.schedule_drain();
    }

    /// Operations waiting behind the one holding the execution slot.
    pub fn len(&self) -> usize {
        self.inner.lock().operations.len()
    }

    pub fn is_idle(&self) -> bool {
        let inner = self.inner.lock();
        !inner.running && inner.operations.is_empty()
    }

    fn schedule_drain(self: &Arc<Self>) {
        let queue = Arc::clone(self);
        dispatch_or_run(&self.executor, move || queue.drain());
    }

    fn drain(self: &Arc<Self>) {
        loop {
            let operation = {
                let mut inner = self.inner.lock();
                match inner.operations.pop_front() {
                    Some(operation) => operation,
                    None => {
                        inner.running = false;
                        return;
                    }
                }
            };

            let handoff = Arc::new(AtomicU8::new(PENDING));
            let done = OperationDone {
                queue: Arc::clone(self),
                handoff: Arc::clone(&handoff),
            };

            // A panicking operation drops its `done` while unwinding, which leaves the
            // handoff COMPLETED, so draining simply moves on.
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || operation(done))) {
                error!(
                    "cl-stream: queued operation panicked: {}",
                    panic_message(&payload)
                );
            }

            if handoff.compare_exchange(
                PENDING,
                DETACHED,
                Ordering::AcqRel,
                Ordering::Acquire
            ).is_ok() {
                // Still in flight: its completion resumes draining.
                return;
            }
        }
    }
}

/// Releases the execution slot when completed or dropped.
pub(crate) struct OperationDone {
    queue: Arc<ExecutionQueue>,
    handoff: Arc<AtomicU8>,
}

impl OperationDone {
    pub fn complete(self) {
        drop(self);
    }
}

impl Drop for OperationDone {
    fn drop(&mut self) {
        if self.handoff.compare_exchange(
            PENDING,
            COMPLETED,
            Ordering::AcqRel,
            Ordering::Acquire
        ).is_err() {
            self.queue.schedule_drain();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{InlineExecutor, ThreadPool};
    use std::time::Duration;

    #[test]
    fn synchronous_operations_run_in_order() {
        let queue = ExecutionQueue::new(Arc::new(InlineExecutor));
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            queue.push(Box::new(move |done| {
                order.lock().push(i);
                done.complete();
            }));
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_idle());
    }

    #[test]
    fn later_operation_waits_for_deferred_completion() {
        let queue = ExecutionQueue::new(Arc::new(InlineExecutor));
        let parked = Arc::new(Mutex::new(None));
        let order = Arc::new(Mutex::new(Vec::new()));

        let slot = parked.clone();
        let o = order.clone();
        queue.push(Box::new(move |done| {
            o.lock().push("first");
            *slot.lock() = Some(done);
        }));

        let o = order.clone();
        queue.push(Box::new(move |done| {
            o.lock().push("second");
            done.complete();
        }));

        assert_eq!(*order.lock(), vec!["first"]);
        assert_eq!(queue.len(), 1);

        let done = parked.lock().take().unwrap();
        done.complete();
        assert_eq!(*order.lock(), vec!["first", "second"]);
        assert!(queue.is_idle());
    }

    #[test]
    fn completion_from_other_threads_keeps_order() {
        let pool = Arc::new(ThreadPool::with_threads(4).start().unwrap());
        let queue = ExecutionQueue::new(pool.clone());
        let (tx, rx) = crossbeam_channel::unbounded();

        for i in 0..200 {
            let tx = tx.clone();
            let pool = pool.clone();
            queue.push(Box::new(move |done| {
                if i % 3 == 0 {
                    tx.send(i).unwrap();
                    done.complete();
                } else {
                    pool.spawn(move || {
                        tx.send(i).unwrap();
                        done.complete();
                    }).unwrap();
                }
            }));
        }

        let seen: Vec<i32> = (0..200)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_operation_releases_slot() {
        let queue = ExecutionQueue::new(Arc::new(InlineExecutor));
        let ran = Arc::new(Mutex::new(false));

        fn failing(_done: OperationDone) {
            panic!("operation failed");
        }

        queue.push(Box::new(failing));
        let r = ran.clone();
        queue.push(Box::new(move |done| {
            *r.lock() = true;
            done.complete();
        }));

        assert!(*ran.lock());
        assert!(queue.is_idle());
    }

    #[test]
    fn dropped_done_releases_slot() {
        let queue = ExecutionQueue::new(Arc::new(InlineExecutor));
        let ran = Arc::new(Mutex::new(false));

        queue.push(Box::new(|done| drop(done)));
        let r = ran.clone();
        queue.push(Box::new(move |done| {
            *r.lock() = true;
            done.complete();
        }));

        assert!(*ran.lock());
    }
}
