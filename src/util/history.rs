//! Insertion-ordered history implemented using VecDeque
use serde::{Deserialize, Serialize};
use std::collections::vec_deque::Iter;
use std::collections::VecDeque;
use std::ops::Index;

/// Chronological queue of recorded items. New items are appended at the back, eviction happens
/// at the front.
///
/// The queue itself is unbounded; retention limits are enforced by whoever owns it, via
/// [`History::evict_beyond`].
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct History<A> {
    deq: VecDeque<A>,
}

impl<A> Default for History<A> {
    fn default() -> Self {
        Self {
            deq: VecDeque::new(),
        }
    }
}

impl<A> History<A> {
    pub fn new() -> Self {
        Self {
            deq: VecDeque::new(),
        }
    }
    pub fn iter(&self) -> Iter<'_, A> {
        self.deq.iter()
    }
    pub fn append_back(&mut self, e: A) {
        self.deq.push_back(e);
    }
    pub fn peek_back(&self) -> Option<&A> {
        self.deq.back()
    }
    pub fn len(&self) -> usize {
        self.deq.len()
    }
    pub fn is_empty(&self) -> bool {
        self.deq.is_empty()
    }

    /// The `n` most recent items, oldest first.
    pub fn latest(&self, n: usize) -> impl DoubleEndedIterator<Item = &A> + '_ {
        self.deq.iter().skip(self.len().saturating_sub(n))
    }

    /// Drop the oldest items until at most `limit` remain. Returns the number of evicted items.
    pub fn evict_beyond(&mut self, limit: usize) -> usize {
        let excess = self.len().saturating_sub(limit);
        self.deq.drain(..excess);

        excess
    }
}

impl<A> Index<usize> for History<A> {
    type Output = A;

    fn index(&self, index: usize) -> &Self::Output {
        self.deq.index(index)
    }
}

impl<A> FromIterator<A> for History<A> {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        let mut history = History::new();
        history.extend(iter);
        history
    }
}

impl<A> Extend<A> for History<A> {
    fn extend<T: IntoIterator<Item = A>>(&mut self, iter: T) {
        for item in iter.into_iter() {
            self.append_back(item);
        }
    }
}
