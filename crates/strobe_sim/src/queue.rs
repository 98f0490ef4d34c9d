//! Time-ordered pending wake-ups.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use strobe_ir::DomainId;

use crate::time::SimTime;

/// Index of a process registered with the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub(crate) u32);

impl ProcessId {
    /// Returns the registration index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// What a queued event does when it comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Run the registered-update step of a domain whose clock just took
    /// its active edge.
    EdgeCheck(DomainId),
    /// Resume a process waiting for the next active edge of a domain.
    TickWake(ProcessId, DomainId),
    /// Resume a process waiting out a delay or a settle.
    DelayWake(ProcessId),
}

impl EventKind {
    /// Edge steps at a given time run before any process resumes.
    fn rank(self) -> u8 {
        match self {
            EventKind::EdgeCheck(_) => 0,
            EventKind::TickWake(..) | EventKind::DelayWake(_) => 1,
        }
    }
}

/// A scheduled event.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    /// When the event comes due.
    pub time: SimTime,
    /// Insertion order, breaking ties deterministically.
    seq: u64,
    /// What to do.
    pub kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then(self.kind.rank().cmp(&other.kind.rank()))
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of events ordered by time, then edge steps before wake-ups,
/// then insertion order.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind` at `time`.
    pub fn push(&mut self, time: SimTime, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Event { time, seq, kind }));
    }

    /// Returns the earliest event without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|Reverse(e)| e)
    }

    /// Removes and returns the earliest event.
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|Reverse(e)| e)
    }

    /// Removes every edge step due at exactly `time`, returning their domains.
    pub fn drain_edges_at(&mut self, time: SimTime) -> Vec<DomainId> {
        let mut domains = Vec::new();
        while let Some(event) = self.peek() {
            match event.kind {
                EventKind::EdgeCheck(domain) if event.time == time => {
                    domains.push(domain);
                    self.heap.pop();
                }
                _ => break,
            }
        }
        domains
    }

    /// Returns the number of queued events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
