//! The dispatch boundary every primitive in this crate schedules work through.
//!
//! Nothing here owns a thread on behalf of the caller: futures and file states are handed an
//! [`Executor`] and push fire-and-forget [`Work`] onto it. [`ThreadPool`] is the default
//! implementation; [`InlineExecutor`] runs work on the dispatching thread and is mostly useful
//! for deterministic tests.

pub mod pool;
pub mod worker;

pub use pool::{PoolConfig, PoolStartError, ThreadPool};
pub use worker::WorkerState;

use std::{fmt, sync::Arc};
use thiserror::Error;

/// A unit of work that runs exactly once.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

pub trait Executor: Send + Sync {
    /// Queues `work` for asynchronous execution. No ordering is guaranteed relative to other
    /// dispatched work. On failure the work is handed back inside the error.
    fn dispatch(&self, work: Work) -> Result<(), DispatchError>;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn dispatch(&self, work: Work) -> Result<(), DispatchError> {
        (**self).dispatch(work)
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn dispatch(&self, work: Work) -> Result<(), DispatchError> {
        (**self).dispatch(work)
    }
}

/// Runs every piece of work immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn dispatch(&self, work: Work) -> Result<(), DispatchError> {
        work();
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DispatchErrorKind {
    #[error("Executor is shutting down")]
    ShuttingDown,

    #[error("Executor has no running workers")]
    NoWorkers,
}

#[derive(Error)]
#[error("Failed to dispatch work: {kind}")]
pub struct DispatchError {
    pub work: Work,

    #[source]
    pub kind: DispatchErrorKind,
}

impl DispatchError {
    pub fn shutting_down(work: Work) -> Self {
        Self { work, kind: DispatchErrorKind::ShuttingDown }
    }

    pub fn no_workers(work: Work) -> Self {
        Self { work, kind: DispatchErrorKind::NoWorkers }
    }

    /// Recovers the work that could not be dispatched.
    pub fn into_work(self) -> Work {
        self.work
    }
}

impl fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchError")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Dispatches `f` on `executor`. If the executor refuses it, `f` runs on the calling thread
/// instead so that the work is never lost.
pub fn dispatch_or_run<E, F>(executor: &E, f: F)
where
    E: Executor + ?Sized,
    F: FnOnce() + Send + 'static,
{
    if let Err(e) = executor.dispatch(Box::new(f)) {
        warn!("cl-stream: {}; running work inline", e.kind);
        (e.into_work())();
    }
}
