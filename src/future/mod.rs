//! Promise/future pairs with chained continuations.
//!
//! A [`Promise`] writes exactly one value; its [`Future`] reads it exactly once, or converts
//! into a [`SharedFuture`] that any number of copies can read. Continuations are attached
//! with [`Future::next`] (receives the value) and [`Future::then`] (receives the ready
//! future).
//!
//! `next`/`then` run the continuation inline: on the thread that fulfills the promise, or on
//! the attaching thread when the value is already there. Callers holding a lock across one of
//! these calls must therefore expect re-entrancy. `next_on`/`then_on` always go through an
//! [`Executor`](crate::executor::Executor) instead.
//!
//! ```
//! use cl_stream::future::Promise;
//!
//! let mut promise = Promise::new();
//! let doubled = promise.get_future().next(|v: u32| v * 2);
//! promise.set_value(21);
//! assert_eq!(doubled.get(), 42);
//! ```

mod cell;
mod promise;
mod shared;
mod unique;

pub use promise::{make_ready_future, Promise};
pub use shared::SharedFuture;
pub use unique::Future;
