//! Preference backend with injectable failures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use fstore_core::error::BackendError;
use fstore_core::persist::{MemoryPreferences, PreferenceBackend, PreferenceValue};
use tracing::debug;

/// In-memory backend whose reads and writes can be made to fail on demand.
///
/// Writes are `set`, `remove`, and `clear`. Successful writes are counted.
#[derive(Debug, Default)]
pub struct FlakyBackend {
    inner: MemoryPreferences,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of writes that reached the inner store.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The inner store, bypassing failure injection.
    #[must_use]
    pub fn inner(&self) -> &MemoryPreferences {
        &self.inner
    }

    fn check(&self, flag: &AtomicBool, op: &'static str) -> Result<(), BackendError> {
        if flag.load(Ordering::SeqCst) {
            debug!(message = "harness.flaky.inject", op);
            return Err(BackendError::unavailable(format!("injected {op} failure")));
        }
        Ok(())
    }

    fn write<R>(&self, op: &'static str, apply: impl FnOnce() -> Result<R, BackendError>) -> Result<R, BackendError> {
        self.check(&self.fail_writes, op)?;
        let out = apply()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }
}

impl PreferenceBackend for FlakyBackend {
    fn get(&self, key: &str) -> Result<Option<PreferenceValue>, BackendError> {
        self.check(&self.fail_reads, "get")?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: PreferenceValue) -> Result<(), BackendError> {
        self.write("set", || self.inner.set(key, value))
    }

    fn remove(&self, key: &str) -> Result<bool, BackendError> {
        self.write("remove", || self.inner.remove(key))
    }

    fn clear(&self) -> Result<(), BackendError> {
        self.write("clear", || self.inner.clear())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        self.check(&self.fail_reads, "keys")?;
        self.inner.keys()
    }
}
