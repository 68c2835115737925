//! Append-only ordered key/value pair containers.
//!
//! When the serialization engine or the reflection layer assembles the
//! members of an object it does not need a full associative map: it only
//! appends pairs and walks them forward once. [`PairList`] is that
//! contract, with two implementations:
//!
//! - [`FixedPairs`]: backed by a pre-sized slot array. Appending beyond
//!   capacity is a bounds violation and panics; the caller must know the
//!   capacity up front (reflection does, since the field plan is fixed).
//! - [`GrowablePairs`]: `Vec`-backed with amortized growth, for callers
//!   that cannot size ahead of time.
//!
//! Both are consumed uniformly through the trait.

use crate::Value;

/// Append-only ordered collection of `(key, value)` pairs.
pub trait PairList {
    /// Appends a pair at the end.
    fn push(&mut self, key: String, value: Value);

    /// Forward-ordered view of the pairs appended so far.
    fn pairs(&self) -> &[(String, Value)];

    /// Number of pairs appended.
    fn len(&self) -> usize {
        self.pairs().len()
    }

    /// Returns `true` if no pairs have been appended.
    fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }

    /// Removes all pairs, keeping capacity.
    fn clear(&mut self);
}

/// Fixed-capacity pair list.
///
/// # Panics
///
/// `push` panics when the pre-sized capacity is exhausted. That is a
/// programming error on the caller's side, not a recoverable condition.
#[derive(Debug, Clone)]
pub struct FixedPairs {
    slots: Vec<(String, Value)>,
    capacity: usize,
}

impl FixedPairs {
    /// Creates a pair list holding at most `capacity` pairs.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        FixedPairs {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// The fixed capacity this list was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Consumes the list, yielding the pairs in append order.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.slots
    }
}

impl PairList for FixedPairs {
    fn push(&mut self, key: String, value: Value) {
        assert!(
            self.slots.len() < self.capacity,
            "FixedPairs capacity {} exceeded",
            self.capacity
        );
        self.slots.push((key, value));
    }

    fn pairs(&self) -> &[(String, Value)] {
        &self.slots
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Growable pair list with amortized-doubling storage.
#[derive(Debug, Clone, Default)]
pub struct GrowablePairs {
    slots: Vec<(String, Value)>,
}

impl GrowablePairs {
    /// Creates an empty growable pair list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PairList for GrowablePairs {
    fn push(&mut self, key: String, value: Value) {
        self.slots.push((key, value));
    }

    fn pairs(&self) -> &[(String, Value)] {
        &self.slots
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_keeps_order() {
        let mut pairs = FixedPairs::with_capacity(3);
        pairs.push("a".to_string(), Value::from(1));
        pairs.push("b".to_string(), Value::from(2));
        let keys: Vec<_> = pairs.pairs().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    #[should_panic(expected = "capacity 1 exceeded")]
    fn fixed_overflow_panics() {
        let mut pairs = FixedPairs::with_capacity(1);
        pairs.push("a".to_string(), Value::Null);
        pairs.push("b".to_string(), Value::Null);
    }

    #[test]
    fn growable_grows_and_clears() {
        let mut pairs = GrowablePairs::new();
        for i in 0..100 {
            pairs.push(format!("k{}", i), Value::from(i));
        }
        assert_eq!(pairs.len(), 100);
        pairs.clear();
        assert!(pairs.is_empty());
    }

    #[test]
    fn both_usable_through_trait() {
        fn fill(list: &mut dyn PairList) {
            list.push("x".to_string(), Value::from(1));
        }
        let mut fixed = FixedPairs::with_capacity(1);
        let mut growable = GrowablePairs::new();
        fill(&mut fixed);
        fill(&mut growable);
        assert_eq!(fixed.pairs(), growable.pairs());
    }
}
