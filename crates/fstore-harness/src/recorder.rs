//! Recording observer.
//!
//! ```
//! use fstore_core::subject::Subject;
//! use fstore_harness::recorder::{Notification, Recorder};
//!
//! let subject = Subject::new(1);
//! let recorder = Recorder::new();
//! let _sub = subject.subscribe(recorder.clone()).unwrap();
//! subject.publish(2).unwrap();
//! subject.complete().unwrap();
//!
//! assert_eq!(recorder.values(), vec![1, 2]);
//! assert_eq!(recorder.notifications().last(), Some(&Notification::Completed));
//! ```

use std::sync::Arc;

use fstore_core::error::SharedError;
use fstore_core::observer::Observer;
use parking_lot::Mutex;

/// One delivered notification.
#[derive(Debug, Clone)]
pub enum Notification<T> {
    Next(T),
    Error(SharedError),
    Completed,
}

impl<T: PartialEq> PartialEq for Notification<T> {
    /// Errors compare by identity, so a test can assert that the exact stored
    /// payload was delivered.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Next(a), Self::Next(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => Arc::ptr_eq(a, b),
            (Self::Completed, Self::Completed) => true,
            _ => false,
        }
    }
}

/// Observer that appends every notification to an in-memory log.
#[derive(Debug)]
pub struct Recorder<T> {
    log: Mutex<Vec<Notification<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Recorder<T> {
    /// A new recorder, already wrapped for `subscribe`.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<Notification<T>> {
        self.log.lock().clone()
    }

    /// Only the `Next` payloads, in delivery order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.log
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<Notification<T>> {
        std::mem::take(&mut *self.log.lock())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.log.lock().last(), Some(Notification::Completed))
    }

    /// The delivered error, if the last notification was one.
    #[must_use]
    pub fn error(&self) -> Option<SharedError> {
        match self.log.lock().last() {
            Some(Notification::Error(error)) => Some(Arc::clone(error)),
            _ => None,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observer<T> for Recorder<T> {
    fn on_next(&self, value: &T) {
        self.log.lock().push(Notification::Next(value.clone()));
    }

    fn on_error(&self, error: &SharedError) {
        self.log.lock().push(Notification::Error(Arc::clone(error)));
    }

    fn on_completed(&self) {
        self.log.lock().push(Notification::Completed);
    }
}
