//! A discrete-event scheduler keyed by virtual time.

use std::{cmp::Ordering, collections::BinaryHeap};

use crate::{network::PacketId, units::Millisecs};

/// Events driving the flow simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Try to send one packet, then check every node for timeouts. Re-arms itself.
    Generate { epoch: u64 },
    /// Let congestion drain from every node. Re-arms itself.
    Decay { epoch: u64 },
    /// Deliver the acknowledgment for a packet that reached its destination.
    Ack { packet: PacketId },
}

/// An event scheduled for execution at a specific virtual time.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct ScheduledEvent {
    time: Millisecs,
    event: Event,
    sequence: u64, // For deterministic ordering
}

impl ScheduledEvent {
    pub fn time(&self) -> Millisecs {
        self.time
    }

    pub fn into_event(self) -> Event {
        self.event
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // `BinaryHeap` is a max heap; reverse both keys so the earliest event pops first
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// A priority queue of events. Events at the same time fire in the order they were scheduled.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, time: Millisecs, event: Event) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledEvent::new(time, event, sequence));
    }

    pub fn pop_earliest(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop()
    }

    pub fn peek_earliest(&self) -> Option<&ScheduledEvent> {
        self.heap.peek()
    }

    /// Pops the earliest event if it is due at or before `deadline`.
    pub fn pop_due(&mut self, deadline: Millisecs) -> Option<ScheduledEvent> {
        match self.heap.peek() {
            Some(e) if e.time <= deadline => self.heap.pop(),
            _ => None,
        }
    }

    /// Drops every pending event.
    pub fn cancel_all(&mut self) {
        self.heap.clear();
    }

    delegate::delegate! {
        to self.heap {
            pub fn is_empty(&self) -> bool;

            pub fn len(&self) -> usize;
        }
    }
}
