#![forbid(unsafe_code)]

//! FrankenStore public facade crate.
//!
//! Reducer-driven observable stores, with an optional preference-backed
//! variant that survives restarts.
//!
//! ```
//! use fstore::prelude::*;
//!
//! #[derive(Debug)]
//! enum Theme {
//!     Toggle,
//! }
//! impl Event for Theme {}
//!
//! let prefs = PreferencesConfig::memory().with_namespace("app").open()?;
//! let dark = PersistedStore::open(prefs.clone(), "dark_mode", false, |on: bool, _: &Theme| !on)?;
//! dark.dispatch(Theme::Toggle)?;
//!
//! assert_eq!(prefs.get("dark_mode")?, Some(PreferenceValue::Bool(true)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use fstore_core as core;

pub mod prelude {
    pub use fstore_core::config::{BackendKind, PreferencesConfig};
    pub use fstore_core::error::{BackendError, CodecError, Result, SharedError, StoreError};
    pub use fstore_core::event::Event;
    pub use fstore_core::json_codec;
    pub use fstore_core::observer::{Callbacks, Observer, Subscription, filter};
    pub use fstore_core::persist::{
        FilePreferences, Json, MemoryPreferences, Namespaced, PersistedStore, PersistedSubject,
        PreferenceBackend, PreferenceCodec, PreferenceValue,
    };
    pub use fstore_core::reducer::Reducer;
    pub use fstore_core::store::{DynStore, Store};
    pub use fstore_core::subject::{Subject, Terminal};
}
