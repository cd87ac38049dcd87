//! Dispatchable events.
//!
//! [`Event`] is a marker: any `Debug + Send + Sync + 'static` type may opt in
//! with an empty impl. Events are plain data; they carry no behavior.
//!
//! Stores are usually typed over one event enum. When a store must accept
//! events from unrelated producers, use `Box<dyn Event>` as the event type and
//! recover the concrete type with `downcast_ref`
//! inside the reducer:
//!
//! ```
//! use fstore_core::event::Event;
//!
//! #[derive(Debug)]
//! struct Rename(String);
//! impl Event for Rename {}
//!
//! #[derive(Debug)]
//! struct Logout;
//! impl Event for Logout {}
//!
//! let boxed: Box<dyn Event> = Box::new(Rename("ada".into()));
//! assert_eq!(boxed.downcast_ref::<Rename>().map(|r| r.0.as_str()), Some("ada"));
//! assert!(boxed.downcast_ref::<Logout>().is_none());
//! ```

use std::any::Any;
use std::fmt;

/// Upcast helper so `dyn Event` can expose its concrete type.
///
/// Implemented for every `'static` type; not meant to be implemented by hand.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Marker for values that can be dispatched to a store.
pub trait Event: AsAny + fmt::Debug + Send + Sync {}

impl dyn Event {
    /// Borrow the event as `E` if that is its concrete type.
    #[must_use]
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }

    #[must_use]
    pub fn is<E: Event>(&self) -> bool {
        self.as_any().is::<E>()
    }
}

impl Event for Box<dyn Event> {}
