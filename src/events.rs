use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use crate::clients::ClientId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    Arrival,
    ValidationComplete { client: ClientId },
    ChargeComplete { client: ClientId },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Arrival => EventKind::Arrival,
            Event::ValidationComplete { .. } => EventKind::ValidationComplete,
            Event::ChargeComplete { .. } => EventKind::ChargeComplete,
        }
    }

    fn priority(&self) -> u8 {
        match self {
            Event::ChargeComplete { .. } => 0,
            Event::ValidationComplete { .. } => 1,
            Event::Arrival => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Arrival,
    ValidationComplete,
    ChargeComplete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Arrival => "arrival",
            EventKind::ValidationComplete => "validation-complete",
            EventKind::ChargeComplete => "charge-complete",
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ScheduledEvent {
    pub time: f64,
    pub seq: u64,
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(time: f64, seq: u64, event: Event) -> Self {
        Self { time, seq, event }
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.event.priority().cmp(&other.event.priority()))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

/// Pending events, earliest first. Ties go to charge completions, then
/// validation completions, then arrivals, then insertion order.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, time: f64, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledEvent::new(time, seq, event)));
    }

    pub fn peek(&self) -> Option<&ScheduledEvent> {
        self.heap.peek().map(|Reverse(scheduled)| scheduled)
    }

    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop().map(|Reverse(scheduled)| scheduled)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut EventQueue) -> Vec<(f64, Event)> {
        std::iter::from_fn(|| queue.pop())
            .map(|scheduled| (scheduled.time, scheduled.event))
            .collect()
    }

    #[test]
    fn pops_in_time_order() {
        let mut queue = EventQueue::new();
        queue.schedule(5.0, Event::Arrival);
        queue.schedule(1.5, Event::ValidationComplete { client: 1 });
        queue.schedule(3.0, Event::ChargeComplete { client: 2 });
        let times = drain(&mut queue)
            .into_iter()
            .map(|(time, _)| time)
            .collect::<Vec<_>>();
        assert_eq!(times, vec![1.5, 3.0, 5.0]);
    }

    #[test]
    fn ties_prefer_charge_then_validation_then_arrival() {
        let mut queue = EventQueue::new();
        queue.schedule(10.0, Event::Arrival);
        queue.schedule(10.0, Event::ValidationComplete { client: 4 });
        queue.schedule(10.0, Event::ChargeComplete { client: 3 });
        assert_eq!(
            drain(&mut queue),
            vec![
                (10.0, Event::ChargeComplete { client: 3 }),
                (10.0, Event::ValidationComplete { client: 4 }),
                (10.0, Event::Arrival),
            ]
        );
    }

    #[test]
    fn equal_kind_ties_keep_insertion_order() {
        let mut queue = EventQueue::with_capacity(4);
        queue.schedule(2.0, Event::ChargeComplete { client: 9 });
        queue.schedule(2.0, Event::ChargeComplete { client: 4 });
        queue.schedule(2.0, Event::ChargeComplete { client: 6 });
        let clients = drain(&mut queue)
            .into_iter()
            .map(|(_, event)| event)
            .collect::<Vec<_>>();
        assert_eq!(
            clients,
            vec![
                Event::ChargeComplete { client: 9 },
                Event::ChargeComplete { client: 4 },
                Event::ChargeComplete { client: 6 },
            ]
        );
    }

    #[test]
    fn peek_does_not_remove() {
        let mut queue = EventQueue::new();
        assert!(queue.peek().is_none());
        queue.schedule(7.0, Event::Arrival);
        assert_eq!(queue.peek().map(|scheduled| scheduled.time), Some(7.0));
        assert_eq!(queue.len(), 1);
        assert!(queue.pop().is_some());
        assert!(queue.is_empty());
    }
}
