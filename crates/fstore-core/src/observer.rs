//! Subscriber callbacks and subscription handles.
//!
//! An [`Observer`] receives three kinds of notification from a
//! [`Subject`](crate::subject::Subject): values, a terminal error, or
//! completion. Observers are owned by the caller and registered as
//! `Arc<dyn Observer<T>>`; the subject keeps only the record.
//!
//! [`Subscription`] is the RAII handle returned by `subscribe`. Dropping it
//! (or calling [`Subscription::unsubscribe`]) removes the observer before
//! the next notification batch. A batch that has already started is still
//! delivered to it.

use std::fmt;
use std::marker::PhantomData;

use parking_lot::Mutex;

use crate::error::SharedError;

/// Receiver of notifications from a subject.
///
/// Callbacks run on the publishing thread with no container lock held, so
/// they may call back into the same subject.
pub trait Observer<T>: Send + Sync {
    fn on_next(&self, value: &T);

    fn on_error(&self, error: &SharedError) {
        let _ = error;
    }

    fn on_completed(&self) {}
}

impl<T, O: Observer<T> + ?Sized> Observer<T> for std::sync::Arc<O> {
    fn on_next(&self, value: &T) {
        (**self).on_next(value);
    }

    fn on_error(&self, error: &SharedError) {
        (**self).on_error(error);
    }

    fn on_completed(&self) {
        (**self).on_completed();
    }
}

// ─── Closure observers ───────────────────────────────────────────────────────

type NextFn<T> = Box<dyn Fn(&T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&SharedError) + Send + Sync>;
type CompletedFn = Box<dyn Fn() + Send + Sync>;

/// Observer assembled from closures.
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use fstore_core::observer::{Callbacks, Observer};
///
/// let done = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&done);
/// let observer = Callbacks::new(|_: &u32| {}).with_completed(move || flag.store(true, Ordering::SeqCst));
/// observer.on_completed();
/// assert!(done.load(Ordering::SeqCst));
/// ```
pub struct Callbacks<T> {
    next: NextFn<T>,
    error: Option<ErrorFn>,
    completed: Option<CompletedFn>,
}

impl<T> Callbacks<T> {
    #[must_use]
    pub fn new(next: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            next: Box::new(next),
            error: None,
            completed: None,
        }
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Fn(&SharedError) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(error));
        self
    }

    #[must_use]
    pub fn with_completed(mut self, completed: impl Fn() + Send + Sync + 'static) -> Self {
        self.completed = Some(Box::new(completed));
        self
    }
}

impl<T> fmt::Debug for Callbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("error", &self.error.is_some())
            .field("completed", &self.completed.is_some())
            .finish()
    }
}

impl<T> Observer<T> for Callbacks<T> {
    fn on_next(&self, value: &T) {
        (self.next)(value);
    }

    fn on_error(&self, error: &SharedError) {
        if let Some(handler) = &self.error {
            handler(error);
        }
    }

    fn on_completed(&self) {
        if let Some(handler) = &self.completed {
            handler();
        }
    }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Forwards only the values accepted by `predicate`; terminal notifications
/// always pass through.
pub struct Filter<T, P, O> {
    predicate: P,
    inner: O,
    _marker: PhantomData<fn(&T)>,
}

/// Wrap `inner` so it sees only values matching `predicate`.
pub fn filter<T, P, O>(predicate: P, inner: O) -> Filter<T, P, O>
where
    P: Fn(&T) -> bool + Send + Sync,
    O: Observer<T>,
{
    Filter {
        predicate,
        inner,
        _marker: PhantomData,
    }
}

impl<T, P, O> Observer<T> for Filter<T, P, O>
where
    P: Fn(&T) -> bool + Send + Sync,
    O: Observer<T>,
{
    fn on_next(&self, value: &T) {
        if (self.predicate)(value) {
            self.inner.on_next(value);
        }
    }

    fn on_error(&self, error: &SharedError) {
        self.inner.on_error(error);
    }

    fn on_completed(&self) {
        self.inner.on_completed();
    }
}

// ─── Subscription ────────────────────────────────────────────────────────────

type Detach = Box<dyn FnOnce() + Send>;

/// Handle to a live subscription.
///
/// Removing the observer is idempotent: the first call to
/// [`unsubscribe`](Self::unsubscribe) (or the drop) detaches it, later calls
/// do nothing. Handles returned for terminated subjects are empty.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    detach: Mutex<Option<Detach>>,
}

impl Subscription {
    pub(crate) fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    /// A handle that owns nothing.
    pub fn empty() -> Self {
        Self {
            detach: Mutex::new(None),
        }
    }

    /// Remove the observer from its subject.
    pub fn unsubscribe(&self) {
        let detach = self.detach.lock().take();
        if let Some(detach) = detach {
            detach();
        }
    }

    /// Whether this handle still owns a registration.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.detach.lock().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.get_mut().take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
