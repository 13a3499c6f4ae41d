//! Reference-counted files whose open/load/unload/close transitions are asynchronous.
//!
//! A [`FileState`] counts references per [`OperationOrigin`]. Requests are serialized through
//! a per-file queue: each one keeps the queue until every hook it triggered has completed, so
//! callbacks fire in the order the requests were issued, whatever thread issued them and
//! however long the hooks take.
//!
//! Increments are counted as soon as they are issued. Decrements are applied when they reach
//! the head of the queue. A decrement that was issued before a later increment therefore
//! never closes the file out from under it.

pub mod hooks;
pub mod origin;
pub mod state;

mod queue;

pub use hooks::{
    CloseCompletion,
    DeleteContinuation,
    FileStateHooks,
    LoadCompletion,
    OpenFileCompletion,
    UnloadCompletion
};
pub use origin::OperationOrigin;
pub use state::State;

use std::{
    fmt,
    sync::{
        atomic::{
            AtomicBool,
            AtomicU8,
            Ordering
        },
        Arc
    }
};

use crate::{
    executor::Executor,
    future::{Future, Promise}
};
use origin::OriginCounts;
use queue::{ExecutionQueue, OperationDone};

type IncrementCallback = Box<dyn FnOnce(bool) + Send + 'static>;
type DeleteCallback = Box<dyn FnOnce(DeleteContinuation) + Send + 'static>;
type DoneCallback = Box<dyn FnOnce() + Send + 'static>;

/// How far an origin needs the file to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Residency {
    Opened,
    Loaded,
}

/// A decrement waiting on its hooks.
struct Decrement {
    delete: DeleteCallback,
    done_callback: DoneCallback,
    done: OperationDone,
    /// The total count reached zero, so the file should close.
    release: bool,
}

pub struct FileState<H: FileStateHooks> {
    hooks: H,
    state: AtomicU8,
    counts: OriginCounts,
    // Counted when requests are issued; only used to reject underflowing decrements at the
    // call site.
    claims: OriginCounts,
    queue: Arc<ExecutionQueue>,
}

impl<H: FileStateHooks> FileState<H> {

    pub fn new(hooks: H, executor: Arc<dyn Executor>) -> Arc<Self> {
        debug!(
            "cl-stream: {} {}: created",
            hooks.managing_type_name(),
            hooks.short_id()
        );
        Arc::new(Self {
            hooks,
            state: AtomicU8::new(State::Closed as u8),
            counts: OriginCounts::default(),
            claims: OriginCounts::default(),
            queue: ExecutionQueue::new(executor),
        })
    }

    /// Creates a file state that runs on the process-wide pool.
    pub fn with_default_executor(hooks: H) -> Arc<Self> {
        Self::new(hooks, crate::executor())
    }

    pub fn hooks(&self) -> &H { &self.hooks }
    pub fn short_id(&self) -> u32 { self.hooks.short_id() }

    pub fn state(&self) -> State {
        self.state.load(Ordering::Acquire).into()
    }

    fn set_state(&self, state: State) {
        debug!(
            "cl-stream: {} {}: {} -> {}",
            self.hooks.managing_type_name(),
            self.hooks.short_id(),
            self.state(),
            state
        );
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn count(&self, origin: OperationOrigin) -> usize {
        self.counts.get(origin)
    }

    pub fn total_count(&self) -> usize {
        self.counts.total()
    }

    /// Whether no request is queued or running.
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    fn residency(&self, origin: OperationOrigin) -> Residency {
        if origin == OperationOrigin::Loading && self.hooks.is_streamed_state() {
            Residency::Opened
        } else {
            Residency::Loaded
        }
    }

    /// Takes a reference for `origin` and brings the file to the state that origin needs.
    ///
    /// `callback` receives whether the file reached that state. It fires once, after every
    /// request issued earlier on this file has fired its own callbacks. A `false` result still
    /// holds the reference: it must be released with a decrement like any other.
    pub fn increment_count_async<F>(self: &Arc<Self>, origin: OperationOrigin, callback: F)
    where
        F: FnOnce(bool) + Send + 'static
    {
        self.counts.increment(origin);
        self.claims.increment(origin);

        let this = Arc::clone(self);
        let callback: IncrementCallback = Box::new(callback);
        self.queue.push(Box::new(move |done| {
            this.increment_open(origin, callback, done);
        }));
    }

    /// Releases a reference for `origin`.
    ///
    /// When the last reference across both origins goes away the file is unloaded and closed.
    /// If it ends up closed and [`FileStateHooks::can_delete`] allows it, `delete` is called
    /// with a [`DeleteContinuation`]. The owner may drop the file state there, and must then
    /// complete the continuation. `done` fires for every decrement, after the continuation
    /// when there is one.
    ///
    /// # Panics
    ///
    /// Panics if `origin` holds no reference that is not already being released.
    pub fn decrement_count_async<D, F>(
        self: &Arc<Self>,
        origin: OperationOrigin,
        delete: D,
        done: F
    )
    where
        D: FnOnce(DeleteContinuation) + Send + 'static,
        F: FnOnce() + Send + 'static
    {
        if self.claims.decrement(origin).is_none() {
            panic!(
                "cl-stream: {} {}: {} count decremented below zero",
                self.hooks.managing_type_name(),
                self.hooks.short_id(),
                origin
            );
        }

        let this = Arc::clone(self);
        let delete: DeleteCallback = Box::new(delete);
        let done_callback: DoneCallback = Box::new(done);
        self.queue.push(Box::new(move |done| {
            this.decrement(origin, Decrement { delete, done_callback, done, release: false });
        }));
    }

    /// [`increment_count_async`](Self::increment_count_async) with the result delivered
    /// through a future.
    pub fn increment_count(self: &Arc<Self>, origin: OperationOrigin) -> Future<bool> {
        let mut promise = Promise::new();
        let future = promise.get_future();
        self.increment_count_async(origin, move |result| promise.set_value(result));
        future
    }

    /// [`decrement_count_async`](Self::decrement_count_async) with the delete continuation
    /// completed right away. The future holds whether this decrement released the file.
    pub fn decrement_count(self: &Arc<Self>, origin: OperationOrigin) -> Future<bool> {
        let mut promise = Promise::new();
        let future = promise.get_future();
        let released = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&released);
        self.decrement_count_async(
            origin,
            move |continuation| {
                flag.store(true, Ordering::Release);
                continuation.complete();
            },
            move || promise.set_value(released.load(Ordering::Acquire))
        );
        future
    }

    fn increment_open(
        self: &Arc<Self>,
        origin: OperationOrigin,
        callback: IncrementCallback,
        done: OperationDone
    ) {
        if self.state() != State::Closed {
            return self.increment_load(origin, callback, done);
        }

        if !self.hooks.can_open_file() {
            info!(
                "cl-stream: {} {}: opening is not allowed",
                self.hooks.managing_type_name(),
                self.hooks.short_id()
            );
            return self.increment_done(origin, callback, done);
        }

        self.set_state(State::Opening);
        let this = Arc::clone(self);
        self.hooks.open_file(OpenFileCompletion::new(move |opened| {
            if opened {
                this.set_state(State::Opened);
                this.increment_load(origin, callback, done);
            } else {
                warn!(
                    "cl-stream: {} {}: failed to open file",
                    this.hooks.managing_type_name(),
                    this.hooks.short_id()
                );
                this.set_state(State::Closed);
                this.increment_done(origin, callback, done);
            }
        }));
    }

    fn increment_load(
        self: &Arc<Self>,
        origin: OperationOrigin,
        callback: IncrementCallback,
        done: OperationDone
    ) {
        if self.state() != State::Opened || self.residency(origin) != Residency::Loaded {
            return self.increment_done(origin, callback, done);
        }

        if !self.hooks.can_load_in_sound_engine() {
            info!(
                "cl-stream: {} {}: loading is not allowed",
                self.hooks.managing_type_name(),
                self.hooks.short_id()
            );
            return self.increment_done(origin, callback, done);
        }

        self.set_state(State::Loading);
        let this = Arc::clone(self);
        self.hooks.load_in_sound_engine(LoadCompletion::new(move |loaded| {
            if loaded {
                this.set_state(State::Loaded);
            } else {
                warn!(
                    "cl-stream: {} {}: failed to load in sound engine",
                    this.hooks.managing_type_name(),
                    this.hooks.short_id()
                );
                this.set_state(State::Opened);
            }
            this.increment_done(origin, callback, done);
        }));
    }

    fn increment_done(
        &self,
        origin: OperationOrigin,
        callback: IncrementCallback,
        done: OperationDone
    ) {
        let result = match (self.residency(origin), self.state()) {
            (Residency::Opened, State::Opened | State::Loaded) => true,
            (Residency::Loaded, State::Loaded) => true,
            _ => false,
        };
        callback(result);
        done.complete();
    }

    fn decrement(self: &Arc<Self>, origin: OperationOrigin, mut request: Decrement) {
        let remaining = self.counts.decrement(origin);
        debug_assert!(remaining.is_some(), "claims and counts diverged");

        request.release = self.counts.total() == 0;
        if request.release {
            return self.decrement_unload(request);
        }

        // A streamed file only stays loaded while someone streams it.
        if self.hooks.is_streamed_state()
            && self.counts.get(OperationOrigin::Streaming) == 0
            && self.state() == State::Loaded
        {
            return self.decrement_unload(request);
        }

        self.decrement_done(request);
    }

    fn decrement_unload(self: &Arc<Self>, request: Decrement) {
        if self.state() != State::Loaded {
            return self.decrement_close(request);
        }

        if !self.hooks.can_unload_from_sound_engine() {
            info!(
                "cl-stream: {} {}: unloading is not allowed",
                self.hooks.managing_type_name(),
                self.hooks.short_id()
            );
            return self.decrement_close(request);
        }

        self.set_state(State::Unloading);
        let this = Arc::clone(self);
        self.hooks.unload_from_sound_engine(UnloadCompletion::new(move |unloaded| {
            if unloaded {
                this.set_state(State::Opened);
                this.decrement_close(request);
            } else {
                info!(
                    "cl-stream: {} {}: unload deferred",
                    this.hooks.managing_type_name(),
                    this.hooks.short_id()
                );
                this.set_state(State::Loaded);
                this.decrement_done(request);
            }
        }));
    }

    fn decrement_close(self: &Arc<Self>, request: Decrement) {
        // Increments issued while unloading already count; they need the file open.
        if !request.release || self.counts.total() != 0 || self.state() != State::Opened {
            return self.decrement_done(request);
        }

        if !self.hooks.can_close_file() {
            info!(
                "cl-stream: {} {}: closing is not allowed",
                self.hooks.managing_type_name(),
                self.hooks.short_id()
            );
            return self.decrement_done(request);
        }

        self.set_state(State::Closing);
        let this = Arc::clone(self);
        self.hooks.close_file(CloseCompletion::new(move |closed| {
            if closed {
                this.set_state(State::Closed);
            } else {
                info!(
                    "cl-stream: {} {}: close deferred",
                    this.hooks.managing_type_name(),
                    this.hooks.short_id()
                );
                this.set_state(State::Opened);
            }
            this.decrement_done(request);
        }));
    }

    fn decrement_done(&self, request: Decrement) {
        let Decrement { delete, done_callback, done, release } = request;

        let deletable = release
            && self.state() == State::Closed
            && self.counts.total() == 0
            && self.hooks.can_delete();

        if deletable {
            // The owner may drop this file state inside `delete`; nothing below touches self.
            delete(DeleteContinuation::new(move || {
                done_callback();
                done.complete();
            }));
        } else {
            done_callback();
            done.complete();
        }
    }
}

impl<H: FileStateHooks> fmt::Debug for FileState<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileState")
            .field("type", &self.hooks.managing_type_name())
            .field("short_id", &self.hooks.short_id())
            .field("state", &self.state())
            .field("loading", &self.count(OperationOrigin::Loading))
            .field("streaming", &self.count(OperationOrigin::Streaming))
            .finish()
    }
}

impl<H: FileStateHooks> Drop for FileState<H> {
    fn drop(&mut self) {
        let state = self.state();
        if state != State::Closed || self.counts.total() != 0 {
            warn!(
                "cl-stream: {} {}: dropped while {} with {} references",
                self.hooks.managing_type_name(),
                self.hooks.short_id(),
                state,
                self.counts.total()
            );
        } else {
            debug!(
                "cl-stream: {} {}: destroyed",
                self.hooks.managing_type_name(),
                self.hooks.short_id()
            );
        }
    }
}
