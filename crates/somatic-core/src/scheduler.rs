//! Timed event queue.
//!
//! Movements and falls take game time. When one begins, the engine pushes
//! its completion here keyed by due time; [`Scheduler::pop_due`] hands
//! events back in due-time order, ties broken by insertion order. Events
//! carry the token the realm issued, so a completion for a move that was
//! stopped in the meantime is recognised as stale and ignored downstream.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use somatic_types::CharacterId;

/// Something that happens at a scheduled game time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEvent {
    /// A movement reaches its destination.
    Arrival {
        /// The mover.
        character: CharacterId,
        /// Token issued when the move began.
        token: u64,
    },
    /// A falling body hits the ground (or water).
    Landing {
        /// The faller.
        character: CharacterId,
        /// Token issued when the fall began.
        token: u64,
    },
}

impl ScheduledEvent {
    /// The character the event concerns.
    pub const fn character(&self) -> CharacterId {
        match *self {
            Self::Arrival { character, .. } | Self::Landing { character, .. } => character,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    due_ms: u64,
    seq: u64,
    event: ScheduledEvent,
}

// BinaryHeap is a max-heap; invert so the earliest entry is on top.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Queue of future events.
#[derive(Debug, Default)]
pub struct Scheduler {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` at game time `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, event: ScheduledEvent) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Entry { due_ms, seq, event });
    }

    /// Remove and return the earliest event due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, ScheduledEvent)> {
        if self.heap.peek()?.due_ms > now_ms {
            return None;
        }
        self.heap.pop().map(|e| (e.due_ms, e.event))
    }

    /// Due time of the earliest event.
    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.due_ms)
    }

    /// Drop every event concerning `character`. Returns how many were
    /// dropped.
    pub fn cancel_for(&mut self, character: CharacterId) -> usize {
        let before = self.heap.len();
        self.heap.retain(|e| e.event.character() != character);
        before.saturating_sub(self.heap.len())
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
