//! [libs/core/router/src/queue.rs]
//! Bounded priority queue backing the router's dispatch order.
//!
//! Ordering: higher `priority` dequeues first; within equal priority, the
//! event submitted earlier (smaller `seq`) dequeues first (FIFO within a
//! band), matching §4.1 ("Priority >= 8 pre-empts priority < 8 at dequeue
//! time; within a priority band, FIFO").

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fabric_domain_models::RouterEvent;

#[derive(Debug)]
struct QueuedEvent {
    seq: u64,
    event: RouterEvent,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event.priority == other.event.priority && self.seq == other.seq
    }
}
impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.event
            .priority
            .cmp(&other.event.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Bounded max-heap of pending events. Not thread-safe on its own; the
/// router wraps it in a mutex.
pub struct PriorityQueue {
    capacity: usize,
    heap: BinaryHeap<QueuedEvent>,
    next_seq: u64,
}

impl PriorityQueue {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, heap: BinaryHeap::with_capacity(capacity), next_seq: 0 }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts `event`. If the queue is at capacity, evicts the
    /// lowest-priority event first (which may be the one just inserted)
    /// and returns it so the caller can emit a `router_overflow` signal.
    pub fn push(&mut self, event: RouterEvent) -> Option<RouterEvent> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedEvent { seq, event });

        if self.heap.len() > self.capacity {
            self.evict_lowest_priority()
        } else {
            None
        }
    }

    pub fn pop(&mut self) -> Option<RouterEvent> {
        self.heap.pop().map(|q| q.event)
    }

    fn evict_lowest_priority(&mut self) -> Option<RouterEvent> {
        // BinaryHeap has no peek-min; the queue is bounded (default 10_000)
        // so a linear scan for eviction is cheap relative to the steady-state
        // dispatch cost and keeps the data structure a plain max-heap.
        let mut items: Vec<QueuedEvent> = std::mem::take(&mut self.heap).into_vec();
        let min_index = items
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(index, _)| index)?;
        let evicted = items.remove(min_index);
        self.heap = items.into_iter().collect();
        Some(evicted.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_domain_models::EventType;
    use serde_json::json;

    fn event(priority: u8) -> RouterEvent {
        RouterEvent::new(EventType::SystemAlert, "test", json!({}), priority, 0)
    }

    #[test]
    fn higher_priority_dequeues_first() {
        let mut queue = PriorityQueue::new(10);
        queue.push(event(3));
        queue.push(event(9));
        queue.push(event(5));
        assert_eq!(queue.pop().unwrap().priority, 9);
        assert_eq!(queue.pop().unwrap().priority, 5);
        assert_eq!(queue.pop().unwrap().priority, 3);
    }

    #[test]
    fn equal_priority_is_fifo() {
        let mut queue = PriorityQueue::new(10);
        let first = queue.push(event(5));
        assert!(first.is_none());
        let e1 = event(5);
        let id1 = e1.id.clone();
        queue.push(e1);
        let e2 = event(5);
        let id2 = e2.id.clone();
        queue.push(e2);
        assert_eq!(queue.pop().unwrap().id, id1);
        assert_eq!(queue.pop().unwrap().id, id2);
    }

    #[test]
    fn overflow_evicts_lowest_priority() {
        let mut queue = PriorityQueue::new(2);
        queue.push(event(5));
        queue.push(event(9));
        let evicted = queue.push(event(7));
        assert_eq!(evicted.unwrap().priority, 5);
        assert_eq!(queue.len(), 2);
    }
}
