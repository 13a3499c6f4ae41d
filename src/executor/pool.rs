use std::sync::{
    atomic::{
        AtomicBool,
        Ordering
    },
    Arc
};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use super::{
    worker::{
        Message,
        Worker,
        WorkerStartError,
        WorkerState
    },
    DispatchError,
    Executor,
    Work
};

#[derive(Debug, Error)]
pub enum PoolStartError {
    #[error("A pool needs at least one worker thread")]
    NoThreads,

    #[error("Failed to start worker: {0}")]
    WorkerStartError(#[from] WorkerStartError),
}

/// Settings for a [`ThreadPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub n_threads: usize,
    pub stack_size: Option<usize>,
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            // Blocking waits inside dispatched work need a second thread to make progress.
            n_threads: num_cpus::get().max(2),
            stack_size: None,
            thread_name: String::from("cl-stream-worker"),
        }
    }
}

impl PoolConfig {
    pub fn with_threads(n_threads: usize) -> Self {
        Self { n_threads, ..Self::default() }
    }
}

/// A fixed set of worker threads pulling from one shared FIFO channel.
///
/// Any idle worker takes the oldest queued work, so a worker blocked inside one piece of work
/// never holds up the work queued behind it.
pub struct ThreadPool {
    config: PoolConfig,
    sender: crossbeam_channel::Sender<Message>,
    receiver: crossbeam_channel::Receiver<Message>,
    workers: Mutex<Vec<Worker>>,
    // Dispatch holds the read side while sending so no work can land behind the stop
    // messages.
    stopping: RwLock<bool>,
    killed: Arc<AtomicBool>,
}

impl ThreadPool {

    pub fn new(config: PoolConfig) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            config,
            sender,
            receiver,
            workers: Mutex::new(Vec::new()),
            stopping: RwLock::new(false),
            killed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_threads(n_threads: usize) -> Self {
        Self::new(PoolConfig::with_threads(n_threads))
    }

    pub fn start(self) -> Result<Self, PoolStartError> {
        if self.config.n_threads == 0 { return Err(PoolStartError::NoThreads) }

        info!("cl-stream: Starting {} workers", self.config.n_threads);
        {
            let mut workers = self.workers.lock();
            for i in 0..self.config.n_threads {
                let mut worker = Worker::new(
                    i,
                    self.receiver.clone(),
                    Arc::clone(&self.killed)
                );
                worker.start(&self.config.thread_name, self.config.stack_size)?;
                workers.push(worker);
            }
        }
        Ok(self)
    }

    pub fn num_threads(&self) -> usize {
        self.config.n_threads
    }

    /// Number of dispatched units of work not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.workers.lock().iter().map(|w| w.get_state()).collect()
    }

    pub fn spawn<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static
    {
        self.dispatch(Box::new(f))
    }

    fn signal_stop(&self, msg: fn() -> Message) -> bool {
        let mut stopping = self.stopping.write();
        if *stopping { return false }
        *stopping = true;
        for _ in 0..self.config.n_threads {
            if let Err(e) = self.sender.send(msg()) {
                warn!("cl-stream: Failed to signal worker: {}", e);
            }
        }
        true
    }

    /// Stops accepting work, lets every worker finish what was queued before this call, then
    /// blocks until all workers exited.
    pub fn shutdown(&self) {
        info!("cl-stream: Shutting down all workers");
        self.signal_stop(|| Message::Shutdown);
        self.join();
    }

    /// Stops all workers as soon as their current work returns, dropping queued work.
    pub fn kill(&self) {
        info!("cl-stream: Killing all workers");
        self.killed.store(true, Ordering::Release);
        self.signal_stop(|| Message::Kill);
    }

    pub fn join(&self) {
        info!("cl-stream: Joining all workers");
        let current = std::thread::current().id();
        let handles: Vec<_> = self.workers
            .lock()
            .iter_mut()
            .filter_map(|w| w.take_join_handle().map(|h| (w.id(), h)))
            .collect();

        for (id, handle) in handles {
            if handle.thread().id() == current {
                warn!("cl-stream: Worker {id} cannot join itself");
                continue;
            }
            handle.join().unwrap_or_else(|_| {
                warn!("cl-stream: Failed to join worker {id}");
            });
        }
    }
}

impl Executor for ThreadPool {
    fn dispatch(&self, work: Work) -> Result<(), DispatchError> {
        let stopping = self.stopping.read();
        if *stopping {
            return Err(DispatchError::shutting_down(work));
        }

        match self.sender.send(Message::Run(work)) {
            Ok(()) => Ok(()),
            Err(e) => match e.into_inner() {
                Message::Run(work) => Err(DispatchError::no_workers(work)),
                _ => unreachable!()
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Workers may still be running the work that dropped the last handle, so this only
        // signals them and never joins.
        self.signal_stop(|| Message::Shutdown);
    }
}
