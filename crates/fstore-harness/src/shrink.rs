#![forbid(unsafe_code)]

//! Delta-debugging minimization of event sequences.
//!
//! When a long dispatch sequence drives a store into a bad state, the
//! interesting part is usually a handful of events. [`minimize_events`]
//! runs ddmin over the sequence: it removes chunks (halves, then quarters,
//! and so on), then tries keeping single chunks, accepting any candidate on
//! which the failure still reproduces.
//!
//! The result is 1-minimal: removing any single remaining event makes the
//! failure disappear.
//!
//! ```
//! use fstore_harness::shrink::minimize_events;
//!
//! // Fails whenever a 3 is followed, at any distance, by a 7.
//! let fails = |events: &[u8]| {
//!     events
//!         .iter()
//!         .position(|&e| e == 3)
//!         .is_some_and(|i| events[i..].contains(&7))
//! };
//! let shrunk = minimize_events(vec![1, 3, 5, 2, 9, 7, 4, 8], fails);
//! assert_eq!(shrunk.events, vec![3, 7]);
//! ```

use tracing::debug;

/// Outcome of [`minimize_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shrunk<E> {
    pub events: Vec<E>,
    /// Candidates accepted along the way.
    pub reductions: usize,
    /// Total predicate evaluations, including the initial check.
    pub predicate_calls: usize,
}

/// Shrink `events` while `reproduces` keeps returning `true`.
///
/// # Panics
///
/// Panics if `reproduces` does not hold on the original sequence.
pub fn minimize_events<E, F>(events: Vec<E>, reproduces: F) -> Shrunk<E>
where
    E: Clone,
    F: Fn(&[E]) -> bool,
{
    let mut calls = 1;
    assert!(
        reproduces(&events),
        "failure must reproduce on the original sequence"
    );
    let original_len = events.len();

    let mut current = events;
    let mut reductions = 0;
    let mut n = 2usize;

    while current.len() >= 2 {
        let len = current.len();
        let chunk = len.div_ceil(n);
        let chunks: Vec<(usize, usize)> = (0..n)
            .map(|i| (i * chunk, ((i + 1) * chunk).min(len)))
            .filter(|(start, _)| *start < len)
            .collect();

        let mut accepted = None;

        for &(start, end) in &chunks {
            let candidate: Vec<E> = current[..start]
                .iter()
                .chain(&current[end..])
                .cloned()
                .collect();
            calls += 1;
            if reproduces(&candidate) {
                accepted = Some(candidate);
                break;
            }
        }

        if accepted.is_none() && chunks.len() > 2 {
            for &(start, end) in &chunks {
                let candidate = current[start..end].to_vec();
                calls += 1;
                if reproduces(&candidate) {
                    accepted = Some(candidate);
                    break;
                }
            }
        }

        match accepted {
            Some(candidate) => {
                current = candidate;
                reductions += 1;
                n = 2;
            }
            None if n >= len => break,
            None => n = (n * 2).min(len),
        }
    }

    if current.len() == 1 {
        calls += 1;
        if reproduces(&[]) {
            current.clear();
            reductions += 1;
        }
    }

    debug!(
        message = "harness.shrink.done",
        from = original_len,
        to = current.len(),
        reductions,
        predicate_calls = calls
    );
    Shrunk {
        events: current,
        reductions,
        predicate_calls: calls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_culprit_is_isolated() {
        let events: Vec<u32> = (0..64).collect();
        let shrunk = minimize_events(events, |e| e.contains(&41));
        assert_eq!(shrunk.events, vec![41]);
        assert!(shrunk.reductions > 0);
    }

    #[test]
    fn order_dependent_pair_keeps_order() {
        let events = vec!['a', 'x', 'b', 'y', 'c'];
        let shrunk = minimize_events(events, |e| {
            let x = e.iter().position(|&c| c == 'x');
            let y = e.iter().position(|&c| c == 'y');
            matches!((x, y), (Some(x), Some(y)) if x < y)
        });
        assert_eq!(shrunk.events, vec!['x', 'y']);
    }

    #[test]
    fn already_minimal_sequence_is_unchanged() {
        let shrunk = minimize_events(vec![1, 2], |e| e.len() == 2);
        assert_eq!(shrunk.events, vec![1, 2]);
        assert_eq!(shrunk.reductions, 0);
    }

    #[test]
    fn empty_sequence_when_failure_needs_no_events() {
        let shrunk = minimize_events(vec![5, 6, 7], |_| true);
        assert!(shrunk.events.is_empty());
    }

    #[test]
    #[should_panic(expected = "must reproduce")]
    fn non_reproducing_input_panics() {
        let _ = minimize_events(vec![1], |_| false);
    }
}
