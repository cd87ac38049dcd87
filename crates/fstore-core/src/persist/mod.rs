//! Durable preference storage for subjects and stores.
//!
//! - [`backend`]: the [`PreferenceBackend`] trait, [`MemoryPreferences`], and
//!   key scoping with [`Namespaced`].
//! - [`file`]: [`FilePreferences`], a JSON document on disk.
//! - [`codec`]: typed values to and from [`PreferenceValue`].
//! - [`slot`]: [`PersistedSubject`] and [`PersistedStore`].

pub mod backend;
pub mod codec;
pub mod file;
pub mod slot;

pub use backend::{MemoryPreferences, Namespaced, PreferenceBackend, PreferenceValue};
pub use codec::{Json, PreferenceCodec};
pub use file::FilePreferences;
pub use slot::{PersistedStore, PersistedSubject, PreferenceSlot};
