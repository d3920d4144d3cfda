//! Time-ordered event heap
//!
//! A binary min-heap keyed by `(expires_at_ms, insertion sequence)`, so events with the
//! same deadline come out in the order they were inserted.
//!
//! The timer thread parks on this queue's condition variable. Every insertion and every
//! [`EventQueue::notify_timer`] bumps a generation counter under the heap lock; a timer
//! that observed an older generation does not go to sleep, which closes the window
//! between computing a deadline and starting to wait.

use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;
use tracing::trace;

use crate::error::Result;
use crate::event::Event;
use crate::shutdown::{ShutdownFlag, Wakeable};

#[derive(Debug)]
struct QueuedEvent {
    sequence: u64,
    event: Event,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event.expires_at_ms == other.event.expires_at_ms && self.sequence == other.sequence
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    // Reversed so the max-heap pops the earliest deadline, then the lowest sequence.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .event
            .expires_at_ms
            .cmp(&self.event.expires_at_ms)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default)]
struct EventHeap {
    entries: BinaryHeap<QueuedEvent>,
    next_sequence: u64,
    generation: u64,
}

impl EventHeap {
    fn deadline(&self) -> Option<i64> {
        self.entries.peek().map(|queued| queued.event.expires_at_ms)
    }
}

/// Min-heap of scheduled events
#[derive(Debug)]
pub struct EventQueue {
    heap: Mutex<EventHeap>,
    timer: Condvar,
    shutdown: ShutdownFlag,
}

impl EventQueue {
    /// Create an empty queue bound to `shutdown`
    #[must_use]
    pub fn new(shutdown: ShutdownFlag) -> Self {
        Self {
            heap: Mutex::new(EventHeap::default()),
            timer: Condvar::new(),
            shutdown,
        }
    }

    /// Insert an event
    ///
    /// Returns `true` if the event is now the earliest one, in which case the timer
    /// thread is woken to recompute its deadline. On allocation failure the heap is
    /// left untouched.
    pub fn insert(&self, event: Event) -> Result<bool> {
        let mut heap = self.heap.lock();
        heap.entries.try_reserve(1)?;

        let earliest = heap
            .deadline()
            .is_none_or(|current| event.expires_at_ms < current);
        let sequence = heap.next_sequence;
        heap.next_sequence += 1;
        heap.generation += 1;
        trace!(event_id = %event.id, kind = %event.kind, expires_at_ms = event.expires_at_ms, "Event scheduled");
        heap.entries.push(QueuedEvent { sequence, event });
        drop(heap);

        if earliest {
            self.timer.notify_all();
        }
        Ok(earliest)
    }

    /// Due time of the earliest event
    #[must_use]
    pub fn peek_deadline(&self) -> Option<i64> {
        self.heap.lock().deadline()
    }

    /// Remove the earliest event
    pub fn pop_min(&self) -> Option<Event> {
        self.heap.lock().entries.pop().map(|queued| queued.event)
    }

    /// Remove every event due at `now_ms`, earliest first
    pub fn pop_due(&self, now_ms: i64) -> Vec<Event> {
        let mut heap = self.heap.lock();
        let mut due = Vec::new();
        while heap.entries.peek().is_some_and(|queued| queued.event.is_due(now_ms)) {
            if let Some(queued) = heap.entries.pop() {
                due.push(queued.event);
            }
        }
        due
    }

    /// Remove and return every queued event, earliest first
    pub fn drain(&self) -> Vec<Event> {
        let mut heap = self.heap.lock();
        let mut events = Vec::with_capacity(heap.entries.len());
        while let Some(queued) = heap.entries.pop() {
            events.push(queued.event);
        }
        events
    }

    /// Number of queued events
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.lock().entries.len()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.lock().entries.is_empty()
    }

    /// Current wake generation; pass it to [`EventQueue::wait_for`]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.heap.lock().generation
    }

    /// Wake the timer so it recomputes its deadline (e.g. after a cron job was added)
    pub fn notify_timer(&self) {
        let mut heap = self.heap.lock();
        heap.generation += 1;
        drop(heap);
        self.timer.notify_all();
    }

    /// Park the calling thread for at most `timeout`
    ///
    /// Returns immediately if the generation moved past `observed` or shutdown was
    /// requested. Returns `true` if the wait ended early for either reason.
    pub fn wait_for(&self, timeout: Duration, observed: u64) -> bool {
        let mut heap = self.heap.lock();
        if heap.generation != observed || self.shutdown.is_set() {
            return true;
        }
        let result = self.timer.wait_for(&mut heap, timeout);
        !result.timed_out() || heap.generation != observed || self.shutdown.is_set()
    }
}

impl Wakeable for EventQueue {
    fn wake_all(&self) {
        let _heap = self.heap.lock();
        self.timer.notify_all();
    }
}
