#![forbid(unsafe_code)]

//! Preference-backed subjects and stores.
//!
//! A [`PreferenceSlot`] binds one key on a [`PreferenceBackend`] and acts as
//! the [`Persistence`] hook of a [`Subject`]. The seed is read from the slot
//! when the subject is opened; every later `publish` encodes the value and
//! writes it to the slot before the value commits.
//!
//! # Failure Modes
//!
//! - **Key absent at open**: the default is used as-is and not written.
//! - **Stored value of the wrong kind or unparsable**: `open` fails with
//!   [`StoreError::Codec`](crate::error::StoreError::Codec).
//! - **Backend write fails**: `publish` returns the error; the in-memory
//!   value is unchanged and no observer is notified.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::backend::PreferenceBackend;
use super::codec::PreferenceCodec;
use crate::error::Result;
use crate::event::Event;
use crate::reducer::Reducer;
use crate::store::Store;
use crate::subject::{Persistence, Subject};

/// One key on a shared preference backend.
#[derive(Clone)]
pub struct PreferenceSlot {
    backend: Arc<dyn PreferenceBackend>,
    key: String,
}

impl PreferenceSlot {
    pub fn new(backend: Arc<dyn PreferenceBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn PreferenceBackend> {
        &self.backend
    }

    /// Decode the stored value, or return `default` when the key is absent.
    pub fn load<T: PreferenceCodec>(&self, default: T) -> Result<T> {
        match self.backend.get(&self.key)? {
            Some(stored) => Ok(T::decode(stored)?),
            None => Ok(default),
        }
    }
}

impl<T: PreferenceCodec> Persistence<T> for PreferenceSlot {
    fn write(&self, value: &T) -> Result<()> {
        let stored = value.encode()?;
        self.backend.set(&self.key, stored)?;
        Ok(())
    }
}

impl fmt::Debug for PreferenceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceSlot")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

// ─── Persisted subject ───────────────────────────────────────────────────────

/// A subject whose value lives under one preference key.
pub type PersistedSubject<T> = Subject<T, PreferenceSlot>;

impl<T> Subject<T, PreferenceSlot>
where
    T: PreferenceCodec + Clone + Send + Sync + 'static,
{
    /// Open the subject stored under `key`, seeding it with `default` when the
    /// key has never been written.
    pub fn open(
        backend: Arc<dyn PreferenceBackend>,
        key: impl Into<String>,
        default: T,
    ) -> Result<Self> {
        let slot = PreferenceSlot::new(backend, key);
        let seed = slot.load(default)?;
        debug!(message = "subject.open", key = slot.key());
        Ok(Self::with_persistence(seed, slot))
    }

    #[must_use]
    pub fn key(&self) -> &str {
        self.persistence().key()
    }
}

// ─── Persisted store ─────────────────────────────────────────────────────────

/// A reducer store that survives restarts.
pub type PersistedStore<S, E> = Store<S, E, PreferenceSlot>;

impl<S, E> Store<S, E, PreferenceSlot>
where
    S: PreferenceCodec + Clone + Send + Sync + 'static,
    E: Event,
{
    pub fn open(
        backend: Arc<dyn PreferenceBackend>,
        key: impl Into<String>,
        default: S,
        reducer: impl Reducer<S, E> + 'static,
    ) -> Result<Self> {
        let subject = PersistedSubject::open(backend, key, default)?;
        Ok(Self::from_subject(subject, reducer))
    }

    #[must_use]
    pub fn key(&self) -> &str {
        self.subject().key()
    }
}
