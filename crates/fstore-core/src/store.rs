#![forbid(unsafe_code)]

//! Reducer-driven stores.
//!
//! A [`Store`] owns one [`Subject`] and one [`Reducer`]. `dispatch(event)`
//! reads the current state, runs the reducer on the calling thread, publishes
//! the result, and hands the event back:
//!
//! ```
//! use fstore_core::event::Event;
//! use fstore_core::store::Store;
//!
//! #[derive(Debug)]
//! enum Counter {
//!     Increment,
//!     Decrement,
//! }
//! impl Event for Counter {}
//!
//! let store = Store::new(0_i64, |n: i64, e: &Counter| match e {
//!     Counter::Increment => n + 1,
//!     Counter::Decrement => n - 1,
//! });
//!
//! store.dispatch(Counter::Increment)?;
//! store.dispatch(Counter::Increment)?;
//! store.dispatch(Counter::Decrement)?;
//! assert_eq!(store.current_state()?, 1);
//! # Ok::<(), fstore_core::error::StoreError>(())
//! ```
//!
//! No lock is held while the reducer runs. A reducer that panics unwinds to
//! the caller of `dispatch` and leaves the state untouched.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::event::Event;
use crate::observer::{Observer, Subscription};
use crate::reducer::Reducer;
use crate::subject::{Persistence, Subject, Terminal, Volatile};

/// A store that accepts any boxed [`Event`].
pub type DynStore<S, P = Volatile> = Store<S, Box<dyn Event>, P>;

pub struct Store<S, E, P = Volatile> {
    reducer: Box<dyn Reducer<S, E>>,
    subject: Subject<S, P>,
}

impl<S, E> Store<S, E, Volatile>
where
    S: Clone + Send + Sync + 'static,
    E: Event,
{
    #[must_use]
    pub fn new(initial: S, reducer: impl Reducer<S, E> + 'static) -> Self {
        Self::from_subject(Subject::new(initial), reducer)
    }
}

impl<S, E, P> Store<S, E, P>
where
    S: Clone + Send + Sync + 'static,
    E: Event,
    P: Persistence<S> + 'static,
{
    /// Build a store around an existing subject; the store takes ownership.
    #[must_use]
    pub fn from_subject(subject: Subject<S, P>, reducer: impl Reducer<S, E> + 'static) -> Self {
        Self {
            reducer: Box::new(reducer),
            subject,
        }
    }

    pub fn current_state(&self) -> Result<S> {
        self.subject.current_value()
    }

    pub fn try_current_state(&self) -> Result<Option<S>> {
        self.subject.try_current_value()
    }

    /// Apply `event` through the reducer and publish the new state.
    ///
    /// Returns the same event so call sites can chain or inspect it.
    pub fn dispatch(&self, event: E) -> Result<E> {
        let state = self.subject.current_value()?;
        debug!(message = "store.dispatch", event = ?event);
        let next = self.reducer.reduce(state, &event);
        self.subject.publish(next)?;
        Ok(event)
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer<S>>) -> Result<Subscription> {
        self.subject.subscribe(observer)
    }

    pub fn subscribe_fn(&self, on_next: impl Fn(&S) + Send + Sync + 'static) -> Result<Subscription> {
        self.subject.subscribe_fn(on_next)
    }

    /// The owned container, for terminal operations and diagnostics.
    #[must_use]
    pub fn subject(&self) -> &Subject<S, P> {
        &self.subject
    }

    #[must_use]
    pub fn has_observers(&self) -> bool {
        self.subject.has_observers()
    }

    #[must_use]
    pub fn terminal(&self) -> Terminal {
        self.subject.terminal()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.subject.is_disposed()
    }

    /// Dispose the owned subject. Idempotent.
    pub fn dispose(&self) {
        self.subject.dispose();
    }
}

impl<S, E, P> Drop for Store<S, E, P> {
    fn drop(&mut self) {
        self.subject.dispose();
    }
}

impl<S: fmt::Debug, E, P> fmt::Debug for Store<S, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Counter {
        SetTo(i32),
        Negate,
        SetToZero,
        Explode,
    }
    impl Event for Counter {}

    #[derive(Debug, PartialEq)]
    struct Unrelated;
    impl Event for Unrelated {}

    fn counter(state: i32, event: &Counter) -> i32 {
        match event {
            Counter::SetTo(n) => *n,
            Counter::Negate => -state,
            Counter::SetToZero => 0,
            Counter::Explode => panic!("reducer exploded"),
        }
    }

    #[test]
    fn dispatch_runs_reducer_and_returns_event() {
        let store = Store::new(0, counter);
        assert_eq!(store.dispatch(Counter::SetTo(10)).unwrap(), Counter::SetTo(10));
        assert_eq!(store.current_state().unwrap(), 10);
        store.dispatch(Counter::Negate).unwrap();
        assert_eq!(store.current_state().unwrap(), -10);
        store.dispatch(Counter::SetToZero).unwrap();
        assert_eq!(store.current_state().unwrap(), 0);
    }

    #[test]
    fn subscribers_see_each_dispatched_state() {
        let store = Store::new(1, counter);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe_fn(move |v| sink.lock().push(*v)).unwrap();
        store.dispatch(Counter::Negate).unwrap();
        store.dispatch(Counter::SetTo(3)).unwrap();
        assert_eq!(*seen.lock(), vec![1, -1, 3]);
    }

    #[test]
    fn panicking_reducer_leaves_state_unchanged() {
        let store = Store::new(5, counter);
        let result = catch_unwind(AssertUnwindSafe(|| store.dispatch(Counter::Explode)));
        assert!(result.is_err());
        assert_eq!(store.current_state().unwrap(), 5);
        store.dispatch(Counter::Negate).unwrap();
        assert_eq!(store.current_state().unwrap(), -5);
    }

    #[test]
    fn dyn_store_ignores_unknown_events() {
        let store: DynStore<i32> = Store::new(0, |state: i32, event: &Box<dyn Event>| {
            match event.downcast_ref::<Counter>() {
                Some(Counter::SetTo(n)) => *n,
                Some(Counter::Negate) => -state,
                _ => state,
            }
        });
        store.dispatch(Box::new(Counter::SetTo(4))).unwrap();
        let returned = store.dispatch(Box::new(Unrelated)).unwrap();
        assert_eq!(returned.downcast_ref::<Unrelated>(), Some(&Unrelated));
        assert_eq!(store.current_state().unwrap(), 4);
    }

    #[test]
    fn dispose_is_idempotent_and_blocks_dispatch() {
        let store = Store::new(0, counter);
        store.dispose();
        store.dispose();
        assert!(store.is_disposed());
        assert!(store.dispatch(Counter::SetTo(1)).unwrap_err().is_disposed());
        assert_eq!(store.try_current_state().unwrap(), None);
    }

    #[test]
    fn completed_store_accepts_dispatch_without_change() {
        let store = Store::new(2, counter);
        store.subject().complete().unwrap();
        assert_eq!(store.terminal(), Terminal::Completed);
        store.dispatch(Counter::SetTo(9)).unwrap();
        assert_eq!(store.current_state().unwrap(), 2);
    }

    #[test]
    fn drop_disposes_subject_and_detaches_observers() {
        let store = Store::new(0, counter);
        let sub = store.subscribe_fn(|_| {}).unwrap();
        assert!(store.has_observers());
        drop(store);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }
}
