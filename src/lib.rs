use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;

#[macro_use]
pub (crate) mod logging;

pub mod executor;
pub mod future;
pub mod file_state;

pub use executor::{
    DispatchError,
    Executor,
    InlineExecutor,
    PoolConfig,
    PoolStartError,
    ThreadPool
};
pub use future::{
    make_ready_future,
    Future,
    Promise,
    SharedFuture
};
pub use file_state::{
    FileState,
    FileStateHooks,
    OperationOrigin,
    State
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Pool error: {0}")]
    PoolStart(#[from] PoolStartError),

    #[error("Pool already initialized")]
    AlreadyInitialized,
}

pub type Result<T> = std::result::Result<T, Error>;

static POOL: OnceCell<Arc<ThreadPool>> = OnceCell::new();

fn pool() -> &'static Arc<ThreadPool> {
    POOL.get_or_init(|| {
        Arc::new(
            ThreadPool::new(PoolConfig::default())
            .start()
            .expect("Failed to start thread pool")
        )
    })
}

// Initializes the process-wide pool. Must run before anything else touches it.
pub fn init(config: PoolConfig) -> Result<()> {
    if POOL.get().is_some() { return Err(Error::AlreadyInitialized); }
    let pool = Arc::new(ThreadPool::new(config).start()?);
    POOL.set(pool).map_err(|_| Error::AlreadyInitialized)?;
    Ok(())
}

// Returns the process-wide pool as an executor handle.
pub fn executor() -> Arc<dyn Executor> {
    Arc::clone(pool()) as Arc<dyn Executor>
}

// Schedules work on the process-wide pool.
pub fn dispatch<F>(f: F) -> std::result::Result<(), DispatchError>
where
    F: FnOnce() + Send + 'static
{ pool().spawn(f) }

// Blocks the current thread until all pool threads have been stopped.
pub fn join() { pool().join() }

// Gracefully stops all threads in the pool, letting queued work finish.
pub fn shutdown() { pool().shutdown() }

// Immediately stops all threads in the pool, dropping queued work.
pub fn kill() { pool().kill() }

// Returns the number of threads in the pool.
pub fn num_threads() -> usize { pool().num_threads() }
