//! # Per-renderer concurrency policy
//!
//! A renderer's invocations are treated as occupying a **slot**. Different
//! renderers never share a slot, so they are always independent of each other.
//! The policy decides what happens when a new delivery arrives for a renderer
//! that is already busy.
//!
//! ## Variants
//! - `Parallel`: no slot; every delivery starts its own invocation.
//! - `Serial`: **enqueue** the delivery (FIFO, unbounded).
//! - `Cutoff`: **cancel** the running invocation and run the new delivery next.
//! - `Mute`: **drop** the new delivery.
//!
//! ## Invariants
//! - Outside `Parallel`, invocations of one renderer never overlap.
//! - Queued deliveries are executed strictly in submission order.

use std::fmt;

/// Policy controlling how a renderer's successive invocations may overlap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Concurrency {
    /// Unlimited concurrent invocations.
    ///
    /// Use when:
    /// - Invocations are independent
    /// - Example: appending each action to a log file
    #[default]
    Parallel,

    /// One at a time, later deliveries queue up.
    ///
    /// Use when:
    /// - Every action must be rendered
    /// - Order matters
    /// - Example: speaking messages aloud
    Serial,

    /// One at a time, a new delivery cancels the current invocation.
    ///
    /// Use when:
    /// - A newer action invalidates the older one
    /// - Example: autocomplete lookups while typing
    Cutoff,

    /// One at a time, deliveries arriving while busy are dropped.
    ///
    /// Use when:
    /// - Redundant work should be avoided
    /// - Example: a "refresh" button pressed repeatedly
    Mute,
}

impl Concurrency {
    /// Returns a short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Concurrency::Parallel => "parallel",
            Concurrency::Serial => "serial",
            Concurrency::Cutoff => "cutoff",
            Concurrency::Mute => "mute",
        }
    }

    /// True for the policies that allow at most one in-flight invocation.
    #[inline]
    pub fn is_single_flight(&self) -> bool {
        !matches!(self, Concurrency::Parallel)
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
