#![forbid(unsafe_code)]

//! Core: observable subjects, reducer stores, and preference persistence.
//!
//! - [`subject`]: the thread-safe value container with replay, terminal
//!   states, and disposal.
//! - [`store`]: a subject driven by a [`Reducer`](reducer::Reducer).
//! - [`persist`]: preference backends and the persisted subject/store.
//! - [`config`]: backend selection from JSON, TOML, or the environment.

pub mod config;
pub mod error;
pub mod event;
pub mod observer;
pub mod persist;
pub mod reducer;
pub mod store;
pub mod subject;

pub use error::{BackendError, CodecError, ConfigError, Result, SharedError, StoreError};
pub use event::Event;
pub use observer::{Callbacks, Observer, Subscription};
pub use reducer::Reducer;
pub use store::{DynStore, Store};
pub use subject::{Persistence, Subject, Terminal, Volatile};
