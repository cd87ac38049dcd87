#![forbid(unsafe_code)]

//! Thread-safe observable value container.
//!
//! [`Subject<T, P>`] holds the current value, an ordered set of observers,
//! a terminal state, and a disposed flag, all behind one mutex.
//!
//! # Design
//!
//! Every mutating operation follows the same shape: lock, transition the
//! state and post a notification to each registered observer's mailbox,
//! unlock, then drain the mailboxes this call claimed. Observer code never
//! runs under any lock and may re-enter the same subject from any thread.
//!
//! A mailbox is a FIFO plus a `draining` flag. Posting happens under the
//! container lock, so each observer's queue follows commit order. Posting to
//! an idle mailbox claims it; the claiming thread delivers until the queue is
//! empty. Posting to a mailbox another call is already draining only
//! enqueues, and that call delivers the note. A `publish` can therefore
//! return before an observer busy on another thread has seen its value.
//!
//! `subscribe` creates the new mailbox already claimed with the replayed
//! value queued, so the replay precedes anything a racing `publish` posts
//! and is delivered before `subscribe` returns.
//!
//! The `P: Persistence<T>` parameter runs inside the lock, before the value
//! is committed. [`Volatile`] does nothing; the preference-backed slot in
//! [`persist`](crate::persist) writes the value through to a backend.
//!
//! # Invariants
//!
//! 1. The terminal state leaves [`Terminal::Live`] at most once and never
//!    returns to it.
//! 2. `disposed` is monotonic.
//! 3. The value is present for the whole non-disposed lifetime.
//! 4. A new observer receives the current value before any later value, and
//!    before `subscribe` returns.
//! 5. A batch is posted to exactly the observers registered when it began.
//! 6. After `fail(e)`, every read returns the same `e` (`Arc::ptr_eq`).
//! 7. An observer receives notifications one at a time, in commit order.
//!
//! # Failure Modes
//!
//! - **Persistence write fails**: `publish` returns the error; the value is
//!   not committed and nobody is notified.
//! - **Observer panics**: the panic unwinds to the caller that was draining.
//!   State committed before the notification stays committed. The panicking
//!   observer's mailbox is released, so its remaining notes go out with the
//!   next post; other mailboxes that call claimed are skipped the same way.

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{Result, SharedError, StoreError};
use crate::observer::{Callbacks, Observer, Subscription};

// ─── Persistence hook ────────────────────────────────────────────────────────

/// Write-through hook run under the container lock before a value commits.
pub trait Persistence<T>: Send + Sync {
    fn write(&self, value: &T) -> Result<()>;
}

/// In-memory only: nothing to write.
#[derive(Debug, Clone, Copy, Default)]
pub struct Volatile;

impl<T> Persistence<T> for Volatile {
    fn write(&self, _value: &T) -> Result<()> {
        Ok(())
    }
}

// ─── Terminal state ──────────────────────────────────────────────────────────

/// Lifecycle of a subject. Errors compare by identity.
#[derive(Debug, Clone, Default)]
pub enum Terminal {
    #[default]
    Live,
    Completed,
    Errored(SharedError),
}

impl Terminal {
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    #[must_use]
    pub fn error(&self) -> Option<&SharedError> {
        match self {
            Self::Errored(error) => Some(error),
            _ => None,
        }
    }
}

impl PartialEq for Terminal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Live, Self::Live) | (Self::Completed, Self::Completed) => true,
            (Self::Errored(a), Self::Errored(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ─── Internals ───────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Note<T> {
    Next(Arc<T>),
    Completed,
    Error(SharedError),
}

struct Mailbox<T> {
    pending: VecDeque<Note<T>>,
    draining: bool,
}

struct Slot<T> {
    id: u64,
    observer: Arc<dyn Observer<T>>,
    mailbox: Mutex<Mailbox<T>>,
}

impl<T> Slot<T> {
    /// Queue `note`; `true` means the caller claimed the mailbox and must
    /// [`drain`](Self::drain) it.
    fn post(&self, note: Note<T>) -> bool {
        let mut mailbox = self.mailbox.lock();
        mailbox.pending.push_back(note);
        !mem::replace(&mut mailbox.draining, true)
    }

    fn drain(&self) {
        let _release = ReleaseOnUnwind(&self.mailbox);
        loop {
            let note = {
                let mut mailbox = self.mailbox.lock();
                match mailbox.pending.pop_front() {
                    Some(note) => note,
                    None => {
                        mailbox.draining = false;
                        break;
                    }
                }
            };
            match note {
                Note::Next(value) => self.observer.on_next(&value),
                Note::Completed => self.observer.on_completed(),
                Note::Error(error) => self.observer.on_error(&error),
            }
        }
    }
}

/// Hands a mailbox back if its observer panics mid-drain.
struct ReleaseOnUnwind<'a, T>(&'a Mutex<Mailbox<T>>);

impl<T> Drop for ReleaseOnUnwind<'_, T> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.lock().draining = false;
        }
    }
}

/// Post `note` to every slot, returning the ones this caller must drain.
fn post_all<T: Clone>(slots: &[Arc<Slot<T>>], note: &Note<T>) -> Vec<Arc<Slot<T>>> {
    slots
        .iter()
        .filter(|slot| slot.post(note.clone()))
        .cloned()
        .collect()
}

fn drain_all<T>(claimed: &[Arc<Slot<T>>]) {
    let mut unreached = Unreached(claimed);
    while let Some((slot, rest)) = unreached.0.split_first() {
        unreached.0 = rest;
        slot.drain();
    }
}

/// Hands back the claimed mailboxes a panicking drain never reached.
struct Unreached<'a, T>(&'a [Arc<Slot<T>>]);

impl<T> Drop for Unreached<'_, T> {
    fn drop(&mut self) {
        if thread::panicking() {
            for slot in self.0 {
                slot.mailbox.lock().draining = false;
            }
        }
    }
}

struct State<T> {
    value: Option<T>,
    slots: Vec<Arc<Slot<T>>>,
    terminal: Terminal,
    disposed: bool,
}

impl<T> State<T> {
    fn check_disposed(&self) -> Result<()> {
        if self.disposed {
            return Err(StoreError::Disposed);
        }
        Ok(())
    }

    fn check_fault(&self) -> Result<()> {
        match self.terminal.error() {
            Some(error) => Err(StoreError::Faulted(Arc::clone(error))),
            None => Ok(()),
        }
    }
}

struct Shared<T, P> {
    state: Mutex<State<T>>,
    persistence: P,
    next_id: AtomicU64,
}

impl<T, P> Shared<T, P> {
    fn unsubscribe(&self, id: u64) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.slots.retain(|slot| slot.id != id);
        trace!(
            message = "subject.unsubscribe",
            id,
            observers = state.slots.len()
        );
    }
}

// ─── Subject ─────────────────────────────────────────────────────────────────

/// Observable value container with replay-latest semantics.
pub struct Subject<T, P = Volatile> {
    shared: Arc<Shared<T, P>>,
}

impl<T> Subject<T, Volatile>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an in-memory subject seeded with `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_persistence(value, Volatile)
    }
}

impl<T, P> Subject<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: Persistence<T> + 'static,
{
    /// Create a subject whose published values are written through `persistence`.
    ///
    /// The seed itself is not written.
    #[must_use]
    pub fn with_persistence(value: T, persistence: P) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    value: Some(value),
                    slots: Vec::new(),
                    terminal: Terminal::Live,
                    disposed: false,
                }),
                persistence,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    #[must_use]
    pub fn persistence(&self) -> &P {
        &self.shared.persistence
    }

    /// The current value.
    ///
    /// Fails with [`StoreError::Disposed`] after disposal and with the stored
    /// [`StoreError::Faulted`] error after [`fail`](Self::fail).
    pub fn current_value(&self) -> Result<T> {
        let state = self.shared.state.lock();
        state.check_disposed()?;
        state.check_fault()?;
        state.value.clone().ok_or(StoreError::Disposed)
    }

    /// Like [`current_value`](Self::current_value), but disposal yields
    /// `Ok(None)`. A stored fault is still returned as an error.
    pub fn try_current_value(&self) -> Result<Option<T>> {
        let state = self.shared.state.lock();
        if state.disposed {
            return Ok(None);
        }
        state.check_fault()?;
        Ok(state.value.clone())
    }

    /// Commit `value` and notify every registered observer.
    ///
    /// Does nothing once the subject is terminal.
    pub fn publish(&self, value: T) -> Result<()> {
        let (observers, claimed) = {
            let mut state = self.shared.state.lock();
            state.check_disposed()?;
            if !state.terminal.is_live() {
                trace!(message = "subject.publish.ignored", terminal = ?state.terminal);
                return Ok(());
            }
            if let Err(error) = self.shared.persistence.write(&value) {
                warn!(message = "subject.persist.failed", %error);
                return Err(error);
            }
            state.value = Some(value.clone());
            let claimed = post_all(&state.slots, &Note::Next(Arc::new(value)));
            (state.slots.len(), claimed)
        };

        trace!(
            message = "subject.publish",
            observers,
            claimed = claimed.len()
        );
        drain_all(&claimed);
        Ok(())
    }

    /// Move to [`Terminal::Completed`] and notify the current observers.
    ///
    /// Does nothing if the subject is already terminal.
    pub fn complete(&self) -> Result<()> {
        let (observers, claimed) = {
            let mut state = self.shared.state.lock();
            state.check_disposed()?;
            if !state.terminal.is_live() {
                return Ok(());
            }
            state.terminal = Terminal::Completed;
            let slots = mem::take(&mut state.slots);
            (slots.len(), post_all(&slots, &Note::Completed))
        };

        debug!(message = "subject.complete", observers);
        drain_all(&claimed);
        Ok(())
    }

    /// Move to [`Terminal::Errored`] with `error` and notify the current
    /// observers.
    ///
    /// Does nothing if the subject is already terminal; the first error wins.
    pub fn fail(&self, error: SharedError) -> Result<()> {
        let (observers, claimed) = {
            let mut state = self.shared.state.lock();
            state.check_disposed()?;
            if !state.terminal.is_live() {
                return Ok(());
            }
            state.terminal = Terminal::Errored(Arc::clone(&error));
            let slots = mem::take(&mut state.slots);
            (slots.len(), post_all(&slots, &Note::Error(Arc::clone(&error))))
        };

        debug!(message = "subject.fail", observers, %error);
        drain_all(&claimed);
        Ok(())
    }

    /// [`fail`](Self::fail) with an owned error value.
    pub fn fail_with<E>(&self, error: E) -> Result<()>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.fail(Arc::new(error))
    }

    /// Register `observer`.
    ///
    /// On a live subject the observer receives the current value before this
    /// returns. On a terminal subject it receives only `on_completed` or
    /// `on_error`, is never registered, and the returned handle is empty.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription> {
        let mut state = self.shared.state.lock();
        state.check_disposed()?;

        match state.terminal.clone() {
            Terminal::Live => {
                let value = state.value.clone().ok_or(StoreError::Disposed)?;
                let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
                let slot = Arc::new(Slot {
                    id,
                    observer,
                    mailbox: Mutex::new(Mailbox {
                        pending: VecDeque::from([Note::Next(Arc::new(value))]),
                        draining: true,
                    }),
                });
                state.slots.push(Arc::clone(&slot));
                trace!(
                    message = "subject.subscribe",
                    id,
                    observers = state.slots.len()
                );
                drop(state);

                let weak = Arc::downgrade(&self.shared);
                let subscription = Subscription::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.unsubscribe(id);
                    }
                });
                slot.drain();
                Ok(subscription)
            }
            Terminal::Completed => {
                drop(state);
                observer.on_completed();
                Ok(Subscription::empty())
            }
            Terminal::Errored(error) => {
                drop(state);
                observer.on_error(&error);
                Ok(Subscription::empty())
            }
        }
    }

    /// Register a closure that receives each value.
    pub fn subscribe_fn(&self, on_next: impl Fn(&T) + Send + Sync + 'static) -> Result<Subscription> {
        self.subscribe(Arc::new(Callbacks::new(on_next)))
    }
}

impl<T, P> Subject<T, P> {
    #[must_use]
    pub fn has_observers(&self) -> bool {
        !self.shared.state.lock().slots.is_empty()
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.shared.state.lock().slots.len()
    }

    #[must_use]
    pub fn terminal(&self) -> Terminal {
        self.shared.state.lock().terminal.clone()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }

    /// Release the value and the observers. Idempotent.
    pub fn dispose(&self) {
        let released = {
            let mut state = self.shared.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            (state.value.take(), mem::take(&mut state.slots))
        };
        debug!(message = "subject.dispose", observers = released.1.len());
        // Observer and value destructors run without the lock held.
        drop(released);
    }
}

impl<T: fmt::Debug, P> fmt::Debug for Subject<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Subject")
            .field("value", &state.value)
            .field("observers", &state.slots.len())
            .field("terminal", &state.terminal)
            .field("disposed", &state.disposed)
            .finish()
    }
}
