use std::{collections::VecDeque, time::Instant};

use super::delivery::Delivery;

/// State of a single-flight renderer slot.
pub(super) struct Slot {
    /// Current status (idle, running, or terminating).
    pub status: SlotStatus,

    /// Pending deliveries (FIFO order; at most one under cutoff).
    pub queue: VecDeque<Delivery>,
}

/// Status of a renderer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SlotStatus {
    /// No invocation running, ready to start the next delivery.
    Idle,

    /// Invocation `id` currently running.
    Running {
        id: u64,
        started_at: Instant,
    },

    /// Invocation `id` was cancelled and has not settled yet (cutoff only).
    Terminating {
        id: u64,
        cancelled_at: Instant,
    },
}

impl SlotStatus {
    /// Id of the invocation occupying the slot.
    pub fn current(&self) -> Option<u64> {
        match *self {
            SlotStatus::Idle => None,
            SlotStatus::Running { id, .. } | SlotStatus::Terminating { id, .. } => Some(id),
        }
    }
}

impl Slot {
    /// Creates a new idle slot.
    pub fn new() -> Self {
        Self {
            status: SlotStatus::Idle,
            queue: VecDeque::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.status, SlotStatus::Idle)
    }
}
