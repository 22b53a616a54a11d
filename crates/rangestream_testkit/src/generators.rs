//! Property-based test generators using proptest.
//!
//! Provides strategies for events, stream names, range arguments and
//! operation sequences, plus a plain `Vec` model to check streams against.

use proptest::prelude::*;
use rangestream_core::{range, Event, StreamError, StreamResult};

/// Strategy for generating event payloads (arbitrary bytes).
pub fn event_strategy() -> impl Strategy<Value = Event> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for generating a stream's initial contents.
pub fn events_strategy(max_len: usize) -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(event_strategy(), 0..=max_len)
}

/// Strategy for generating valid stream names.
pub fn stream_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for `(from, to)` arguments, in and slightly out of bounds for
/// streams up to `max_len` events, with negative `to` values included.
pub fn range_strategy(max_len: usize) -> impl Strategy<Value = (u64, i64)> {
    let bound = max_len as i64 + 2;
    (0..=(bound as u64), -bound..=bound)
}

/// One stream operation.
#[derive(Debug, Clone)]
pub enum StreamOp {
    /// Append an event.
    Add(Event),
    /// Read `[from, to)`.
    Read(u64, i64),
    /// Delete `[from, to)`.
    Del(u64, i64),
}

/// Strategy for sequences of stream operations.
pub fn stream_ops_strategy(max_ops: usize) -> impl Strategy<Value = Vec<StreamOp>> {
    let op = prop_oneof![
        2 => event_strategy().prop_map(StreamOp::Add),
        1 => range_strategy(8).prop_map(|(from, to)| StreamOp::Read(from, to)),
        2 => range_strategy(8).prop_map(|(from, to)| StreamOp::Del(from, to)),
    ];
    prop::collection::vec(op, 1..=max_ops)
}

/// A stream held in a `Vec`, with the same range rules as a real one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamModel {
    /// Current contents.
    pub events: Vec<Event>,
}

impl StreamModel {
    /// Creates a model with `events` as the initial contents.
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Appends an event.
    pub fn add(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Expected result of reading `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` exactly where a stream would.
    pub fn read(&self, from: u64, to: i64) -> StreamResult<Vec<Event>> {
        match self.window(from, to)? {
            Some(window) => Ok(self.events[window].to_vec()),
            None => Ok(Vec::new()),
        }
    }

    /// Expected result of deleting `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` exactly where a stream would.
    pub fn del(&mut self, from: u64, to: i64) -> StreamResult<bool> {
        if range::start_index(from, to)? == to {
            return Ok(true);
        }
        match self.window(from, to)? {
            Some(window) if !window.is_empty() => {
                self.events.drain(window);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn window(&self, from: u64, to: i64) -> StreamResult<Option<std::ops::Range<usize>>> {
        let len = self.events.len() as u64;
        let from = range::start_index(from, to)?;
        let window = range::resolve(from, to, len)?;
        Ok(window.map(|w| w.start as usize..w.end as usize))
    }
}

/// Whether an error is a range validation failure.
pub fn is_invalid_range(err: &StreamError) -> bool {
    matches!(err, StreamError::InvalidRange { .. })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a config for quick tests.
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to a proptest config.
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(n: usize) -> StreamModel {
        StreamModel::new((0..n).map(|i| vec![i as u8]).collect())
    }

    #[test]
    fn model_follows_delete_rules() {
        let mut m = model(5);
        assert!(m.del(1, 4).unwrap());
        assert_eq!(m.events, vec![vec![0], vec![4]]);
        assert!(m.del(9, 9).unwrap());
        assert!(!m.del(2, -1).unwrap());
        assert!(m.del(0, -1).unwrap());
        assert!(!m.del(0, -1).unwrap());
    }

    #[test]
    fn model_rejects_out_of_bounds() {
        let m = model(2);
        assert!(is_invalid_range(&m.read(0, 3).unwrap_err()));
        assert_eq!(m.read(0, -1).unwrap().len(), 2);
    }

    proptest! {
        #[test]
        fn generated_ranges_are_bounded((from, to) in range_strategy(4)) {
            prop_assert!(from <= 6);
            prop_assert!((-6..=6).contains(&to));
        }
    }
}
