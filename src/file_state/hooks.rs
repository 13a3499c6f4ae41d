use std::fmt;

/// The operations a file state delegates to its concrete kind.
///
/// The four transition hooks are asynchronous: each receives a completion object that must
/// be consumed exactly once, from any thread and at any later time. The file state does not
/// time hooks out. A completion dropped without being consumed reports a failure (or a
/// deferral) so that the owning queue keeps moving.
///
/// Hooks are called without any lock held by the file state, so they are free to dispatch
/// more work or to call back into other file states.
pub trait FileStateHooks: Send + Sync + 'static {
    /// Names the kind of file in log lines.
    fn managing_type_name(&self) -> &'static str { "File" }

    fn short_id(&self) -> u32;

    fn open_file(&self, completion: OpenFileCompletion);
    fn load_in_sound_engine(&self, completion: LoadCompletion);
    fn unload_from_sound_engine(&self, completion: UnloadCompletion);
    fn close_file(&self, completion: CloseCompletion);

    fn can_delete(&self) -> bool { true }
    fn can_open_file(&self) -> bool { true }
    fn can_load_in_sound_engine(&self) -> bool { true }
    fn can_unload_from_sound_engine(&self) -> bool { true }
    fn can_close_file(&self) -> bool { true }

    /// A streamed state only needs to be opened for the loading origin; the streaming origin
    /// loads it.
    fn is_streamed_state(&self) -> bool { false }
}

type Resume = Box<dyn FnOnce(bool) + Send + 'static>;

macro_rules! completion {
    (
        $(#[$meta:meta])*
        $name:ident, $hook:literal, $ok:ident, $not_ok:ident
    ) => {
        $(#[$meta])*
        #[must_use = "the file state stays blocked until the completion is consumed"]
        pub struct $name {
            resume: Option<Resume>,
        }

        impl $name {
            pub(crate) fn new<F>(resume: F) -> Self
            where
                F: FnOnce(bool) + Send + 'static
            {
                Self { resume: Some(Box::new(resume)) }
            }

            fn finish(&mut self, result: bool) {
                if let Some(resume) = self.resume.take() {
                    resume(result);
                }
            }

            pub fn $ok(mut self) {
                self.finish(true);
            }

            pub fn $not_ok(mut self) {
                self.finish(false);
            }

            /// Consumes the completion with an explicit outcome.
            pub fn complete(mut self, result: bool) {
                self.finish(result);
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                if self.resume.is_some() {
                    warn!(
                        "cl-stream: {} completion dropped without being consumed",
                        $hook
                    );
                    self.finish(false);
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("pending", &self.resume.is_some())
                    .finish()
            }
        }
    };
}

completion!(
    /// Handed to [`FileStateHooks::open_file`].
    OpenFileCompletion, "open_file", succeeded, failed
);

completion!(
    /// Handed to [`FileStateHooks::load_in_sound_engine`].
    LoadCompletion, "load_in_sound_engine", succeeded, failed
);

completion!(
    /// Handed to [`FileStateHooks::unload_from_sound_engine`]. `deferred` means the sound
    /// engine still uses the data; the state stays loaded.
    UnloadCompletion, "unload_from_sound_engine", done, deferred
);

completion!(
    /// Handed to [`FileStateHooks::close_file`]. `deferred` means the file cannot be closed
    /// yet; the state stays opened.
    CloseCompletion, "close_file", done, deferred
);

/// Passed to the delete callback of the decrement that released the file state.
///
/// The owner may drop its last handle to the file state before calling
/// [`complete`](DeleteContinuation::complete); the decrement's done callback runs from inside
/// that call.
#[must_use = "the done callback and the queue wait for this continuation"]
pub struct DeleteContinuation {
    resume: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl DeleteContinuation {
    pub(crate) fn new<F>(resume: F) -> Self
    where
        F: FnOnce() + Send + 'static
    {
        Self { resume: Some(Box::new(resume)) }
    }

    pub fn complete(mut self) {
        if let Some(resume) = self.resume.take() {
            resume();
        }
    }
}

impl Drop for DeleteContinuation {
    fn drop(&mut self) {
        if let Some(resume) = self.resume.take() {
            warn!("cl-stream: delete continuation dropped without being completed");
            resume();
        }
    }
}

impl fmt::Debug for DeleteContinuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteContinuation")
            .field("pending", &self.resume.is_some())
            .finish()
    }
}
