//! # Queue Primitives
//!
//! - [`FifoQueue`]: first-in-first-out.
//! - [`PriorityQueue`]: highest priority first. Within one priority tier the
//!   most recently enqueued item wins (LIFO tie-break).
//!
//! The priority queue is a binary heap keyed on `(priority, insertion_seq)`,
//! giving O(log n) enqueue/dequeue while keeping the LIFO tie-break.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use super::event::Prioritized;

/// First-in-first-out queue.
#[derive(Debug, Clone)]
pub struct FifoQueue<T> {
    items: VecDeque<T>,
}

impl<T> FifoQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Append an item at the back.
    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Remove and return the oldest item.
    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// The oldest item, without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Heap slot: priority first, then insertion order (later wins).
#[derive(Debug, Clone)]
struct Ranked<T> {
    priority: f64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Ranked<T> {}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Max-priority queue with LIFO ordering inside a priority tier.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Ranked<T>>,
    next_seq: u64,
}

impl<T: Prioritized> PriorityQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Insert an item according to its priority.
    pub fn enqueue(&mut self, item: T) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        let priority = item.priority();
        self.heap.push(Ranked {
            // `+ 0.0` folds -0.0 into 0.0 so both share a tier.
            priority: if priority.is_finite() { priority + 0.0 } else { 0.0 },
            seq,
            item,
        });
    }

    /// Remove and return the highest-priority item.
    pub fn dequeue(&mut self) -> Option<T> {
        self.heap.pop().map(|ranked| ranked.item)
    }

    /// The item `dequeue` would return next.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.heap.peek().map(|ranked| &ranked.item)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<T: Prioritized> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
