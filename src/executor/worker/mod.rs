pub mod message;
pub mod state;

pub use message::Message;
pub use state::WorkerState;

use thiserror::Error;

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{
            AtomicBool,
            AtomicU8,
            Ordering
        },
        Arc
    },
    thread::JoinHandle
};

use super::Work;

#[derive(Debug, Error)]
pub enum WorkerStartErrorType {
    #[error("Worker is already running")]
    AlreadyRunning,

    #[error("Failed to spawn worker thread: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

#[derive(Debug, Error)]
#[error("Error while starting worker {id}: {source}")]
pub struct WorkerStartError {
    pub id: usize,

    #[source]
    pub source: WorkerStartErrorType,
}

impl WorkerStartError {
    pub fn new(id: usize, source: WorkerStartErrorType) -> Self {
        Self { id, source }
    }

    pub fn already_running(id: usize) -> Self {
        Self::new(id, WorkerStartErrorType::AlreadyRunning)
    }

    pub fn spawn_failed(id: usize, source: std::io::Error) -> Self {
        Self::new(id, WorkerStartErrorType::SpawnFailed(source))
    }
}

pub struct Worker {
    id: usize,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
    receiver: crossbeam_channel::Receiver<Message>,
    killed: Arc<AtomicBool>,
}

impl Worker {

    pub fn new(
        id: usize,
        receiver: crossbeam_channel::Receiver<Message>,
        killed: Arc<AtomicBool>
    ) -> Self {
        Self {
            id,
            state: Arc::new(AtomicU8::new(WorkerState::None as u8)),
            handle: None,
            receiver,
            killed,
        }
    }

    pub fn id(&self) -> usize { self.id }

    pub fn start(
        &mut self,
        thread_name: &str,
        stack_size: Option<usize>
    ) -> Result<(), WorkerStartError> {
        if self.state.compare_exchange(
            WorkerState::None as u8,
            WorkerState::Starting as u8,
            Ordering::SeqCst,
            Ordering::SeqCst
        ).is_err() { return Err(WorkerStartError::already_running(self.id)) }

        let state = Arc::clone(&self.state);
        let killed = Arc::clone(&self.killed);
        let receiver = self.receiver.clone();
        let id = self.id;

        let mut builder = std::thread::Builder::new().name(format!("{thread_name}-{id}"));
        if let Some(stack_size) = stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder.spawn(move || {
            info!("cl-stream: Worker {} starting", id);
            Self::worker_loop(id, &state, &killed, receiver);
            Self::set_state(&state, WorkerState::Stopped);
            info!("cl-stream: Worker {} stopped", id);
        }).map_err(|e| {
            Self::set_state(&self.state, WorkerState::Stopped);
            WorkerStartError::spawn_failed(self.id, e)
        })?;

        self.handle = Some(handle);
        Ok(())
    }

    fn set_state(state_u8: &AtomicU8, state: WorkerState) {
        state_u8.store(state as u8, Ordering::Release);
    }

    pub fn get_state(&self) -> WorkerState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn take_join_handle(&mut self) -> Option<JoinHandle<()>> {
        self.handle.take()
    }

    fn run_work(id: usize, work: Work) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(work)) {
            error!(
                "cl-stream: Worker {}: dispatched work panicked: {}",
                id,
                panic_message(&payload)
            );
        }
    }

    fn worker_loop(
        id: usize,
        state: &AtomicU8,
        killed: &AtomicBool,
        rx: crossbeam_channel::Receiver<Message>
    ) {
        loop {
            Self::set_state(state, WorkerState::Idle);

            let msg = match rx.recv() {
                Ok(msg) => msg,
                Err(_) => {
                    warn!("cl-stream: Worker {}: work channel disconnected", id);
                    break;
                }
            };

            match msg {
                Message::Run(work) => {
                    if killed.load(Ordering::Acquire) { break; }
                    Self::set_state(state, WorkerState::Busy);
                    Self::run_work(id, work);
                }
                Message::Shutdown => {
                    Self::set_state(state, WorkerState::Stopping);
                    info!("cl-stream: Worker {} shutting down...", id);
                    break;
                }
                Message::Kill => break,
            }
        }
    }
}

pub(crate) fn panic_message(payload: &Box<dyn Any + Send>) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
