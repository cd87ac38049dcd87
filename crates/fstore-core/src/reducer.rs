//! Pure state transitions.
//!
//! A [`Reducer`] maps `(state, event)` to the next state. It must be total:
//! events it does not recognize fall through to a default arm that returns
//! the state unchanged, so producers can add event variants without breaking
//! stores that ignore them.
//!
//! Any `Fn(S, &E) -> S + Send + Sync` closure is a reducer:
//!
//! ```
//! use fstore_core::event::Event;
//! use fstore_core::reducer::Reducer;
//!
//! #[derive(Debug)]
//! enum Counter {
//!     Add(i64),
//!     Reset,
//! }
//! impl Event for Counter {}
//!
//! let reducer = |state: i64, event: &Counter| match event {
//!     Counter::Add(n) => state + n,
//!     Counter::Reset => 0,
//! };
//! assert_eq!(reducer.reduce(40, &Counter::Add(2)), 42);
//! assert_eq!(reducer.reduce(42, &Counter::Reset), 0);
//! ```

use crate::event::Event;

/// A pure `(state, event) -> state` transition.
///
/// Takes the state by value so the default arm can hand it back without a
/// clone. Implementations must not perform I/O or keep references to the
/// event beyond the call.
pub trait Reducer<S, E>: Send + Sync {
    fn reduce(&self, state: S, event: &E) -> S;
}

impl<S, E, F> Reducer<S, E> for F
where
    E: Event,
    F: Fn(S, &E) -> S + Send + Sync,
{
    fn reduce(&self, state: S, event: &E) -> S {
        self(state, event)
    }
}

/// Reducer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<S, E: Event> Reducer<S, E> for Identity {
    fn reduce(&self, state: S, _event: &E) -> S {
        state
    }
}

/// Runs two reducers in sequence, feeding the first one's output to the second.
#[derive(Debug, Clone, Copy)]
pub struct Chain<A, B>(pub A, pub B);

impl<S, E, A, B> Reducer<S, E> for Chain<A, B>
where
    E: Event,
    A: Reducer<S, E>,
    B: Reducer<S, E>,
{
    fn reduce(&self, state: S, event: &E) -> S {
        self.1.reduce(self.0.reduce(state, event), event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Text {
        Append(&'static str),
        Upper,
    }
    impl Event for Text {}

    fn append(state: String, event: &Text) -> String {
        match event {
            Text::Append(s) => state + s,
            _ => state,
        }
    }

    fn upper(state: String, event: &Text) -> String {
        match event {
            Text::Upper => state.to_uppercase(),
            _ => state,
        }
    }

    #[test]
    fn fn_items_are_reducers() {
        assert_eq!(append("ab".into(), &Text::Append("c")), "abc");
        assert_eq!(Reducer::reduce(&append, "ab".into(), &Text::Upper), "ab");
    }

    #[test]
    fn identity_returns_state() {
        assert_eq!(Identity.reduce(5_u8, &Text::Upper), 5);
    }

    #[test]
    fn chain_applies_left_then_right() {
        let both = Chain(append, upper);
        assert_eq!(both.reduce("x".into(), &Text::Append("y")), "xy");
        assert_eq!(both.reduce("xy".into(), &Text::Upper), "XY");
    }
}
