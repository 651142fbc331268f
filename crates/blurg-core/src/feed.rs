//! Chronological feed across diaries.
//!
//! [`FeedQueue`] is a bounded min-priority queue keyed by entry timestamp.
//! Pushing into a full queue drops the pushed entry.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::models::Entry;

/// Capacity used when building a feed from every known diary.
pub const DEFAULT_FEED_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct FeedQueue {
    capacity: usize,
    heap: BinaryHeap<Reverse<Queued>>,
    pushed: u64,
}

impl FeedQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
            pushed: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Queue an entry. Returns `false` when the queue is full and the entry
    /// was dropped.
    pub fn push(&mut self, entry: Entry) -> bool {
        if self.is_full() {
            return false;
        }
        // Insertion sequence keeps equal timestamps in arrival order.
        let seq = self.pushed;
        self.pushed += 1;
        self.heap.push(Reverse(Queued { seq, entry }));
        true
    }

    /// Remove and return the oldest entry.
    pub fn pop(&mut self) -> Option<Entry> {
        self.heap.pop().map(|Reverse(queued)| queued.entry)
    }

    pub fn peek(&self) -> Option<&Entry> {
        self.heap.peek().map(|Reverse(queued)| &queued.entry)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Pop up to `limit` entries, oldest first.
    pub fn drain_oldest(&mut self, limit: usize) -> Vec<Entry> {
        std::iter::from_fn(|| self.pop()).take(limit).collect()
    }
}

#[derive(Debug)]
struct Queued {
    seq: u64,
    entry: Entry,
}

impl Queued {
    fn sort_key(&self) -> (chrono::NaiveDateTime, u64) {
        (self.entry.timestamp, self.seq)
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}
