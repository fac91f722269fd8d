//! # Diagnostic events emitted by the engine.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Registration events**: filters/renderers added and removed
//! - **Dispatch events**: action submitted, filter failed, action settled
//! - **Render events**: one renderer invocation starting and settling
//! - **Runtime events**: diagnostic subscriber trouble, shutdown
//!
//! Renderer failures never reach `submit` callers; this is where they surface.
//!
//! ## Ordering guarantees
//! Each engine numbers its own events: the [`Bus`](super::Bus) stamps `seq`
//! on publish, starting at 1. An event that was never published has `seq == 0`.
//!
//! ## Example
//! ```rust
//! use actionvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RenderFailed)
//!     .with_action(4, "File.append")
//!     .with_subscriber("appender")
//!     .with_reason("disk full");
//!
//! assert_eq!(ev.kind, EventKind::RenderFailed);
//! assert_eq!(ev.subscriber.as_deref(), Some("appender"));
//! assert_eq!(ev.action_seq, Some(4));
//! ```

use std::sync::Arc;
use std::time::SystemTime;

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registration events ===
    /// A filter was registered.
    ///
    /// Sets: `subscriber`
    FilterAdded,

    /// A filter was unsubscribed.
    ///
    /// Sets: `subscriber`
    FilterRemoved,

    /// A renderer was registered and its worker started.
    ///
    /// Sets: `subscriber`, `reason` (concurrency label)
    RendererAdded,

    /// A renderer was unsubscribed (already delivered items still run).
    ///
    /// Sets: `subscriber`
    RendererRemoved,

    // === Dispatch events ===
    /// An action passed all filters and was published.
    ///
    /// Sets: `action_seq`, `action`
    ActionSubmitted,

    /// A filter failed; the action was not published.
    ///
    /// Sets: `action_seq`, `action`, `subscriber`, `reason`
    FilterFailed,

    /// Every renderer the action was dispatched to has settled.
    ///
    /// Sets: `action_seq`, `action`
    ActionSettled,

    // === Render events ===
    /// A renderer invocation is starting.
    ///
    /// Sets: `action_seq`, `action`, `subscriber`
    RenderStarting,

    /// A renderer invocation completed.
    ///
    /// Sets: `action_seq`, `action`, `subscriber`
    RenderCompleted,

    /// A renderer invocation failed or panicked.
    ///
    /// Sets: `action_seq`, `action`, `subscriber`, `reason`
    RenderFailed,

    /// An in-flight renderer invocation was cancelled (cutoff or shutdown).
    ///
    /// Sets: `action_seq`, `action`, `subscriber`
    RenderCancelled,

    /// A delivery was dropped because the renderer was busy (mute).
    ///
    /// Sets: `action_seq`, `action`, `subscriber`
    RenderMuted,

    /// A pending delivery was replaced by a newer one (cutoff).
    ///
    /// Sets: `action_seq`, `action`, `subscriber`
    RenderSuperseded,

    /// A delivery settled without running (dropped by a transform, or queued at shutdown).
    ///
    /// Sets: `action_seq`, `action`, `subscriber`
    RenderSkipped,

    // === Runtime events ===
    /// A diagnostic subscriber panicked.
    ///
    /// Sets: `subscriber`, `reason`
    SubscriberPanicked,

    /// A diagnostic subscriber dropped an event (queue full or closed).
    ///
    /// Sets: `subscriber`, `reason`
    SubscriberOverflow,

    /// Engine shutdown requested.
    ShutdownRequested,

    /// All renderer workers stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some renderer workers did not stop in time.
    ///
    /// Sets: `reason` (stuck renderer names)
    GraceExceeded,
}

/// Engine event with optional metadata.
///
/// - `seq`: per-engine sequence, stamped when the event is published
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Sequence number within the publishing engine (0 until published).
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Submission sequence of the related action.
    pub action_seq: Option<u64>,
    /// Type of the related action.
    pub action: Option<Arc<str>>,
    /// Filter, renderer or diagnostic subscriber name.
    pub subscriber: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new, unpublished event of the given kind with current timestamp.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
            action_seq: None,
            action: None,
            subscriber: None,
            reason: None,
        }
    }

    /// Attaches the related action (submission sequence and type).
    #[inline]
    pub fn with_action(mut self, seq: u64, kind: impl Into<Arc<str>>) -> Self {
        self.action_seq = Some(seq);
        self.action = Some(kind.into());
        self
    }

    /// Attaches a subscriber name.
    #[inline]
    pub fn with_subscriber(mut self, name: impl Into<Arc<str>>) -> Self {
        self.subscriber = Some(name.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event for `dropped`.
    ///
    /// Keeps the action of the dropped event so the loss can be traced back
    /// to a submission.
    pub fn subscriber_overflow(
        subscriber: &'static str,
        reason: &'static str,
        dropped: &Event,
    ) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_subscriber(subscriber)
            .with_reason(format!(
                "subscriber={subscriber} reason={reason} dropped={:?} seq={}",
                dropped.kind, dropped.seq
            ));
        ev.action_seq = dropped.action_seq;
        ev.action = dropped.action.clone();
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_subscriber(subscriber)
            .with_reason(info)
    }

    /// True for the per-invocation render events.
    #[inline]
    pub fn is_render(&self) -> bool {
        matches!(
            self.kind,
            EventKind::RenderStarting
                | EventKind::RenderCompleted
                | EventKind::RenderFailed
                | EventKind::RenderCancelled
                | EventKind::RenderMuted
                | EventKind::RenderSuperseded
                | EventKind::RenderSkipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpublished_event_has_no_seq() {
        assert_eq!(Event::new(EventKind::ActionSubmitted).seq, 0);
    }

    #[test]
    fn test_overflow_keeps_the_dropped_action() {
        let dropped = Event::new(EventKind::RenderFailed).with_action(9, "Speak");
        let ev = Event::subscriber_overflow("log", "full", &dropped);

        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.action_seq, Some(9));
        assert_eq!(ev.action.as_deref(), Some("Speak"));
        assert!(ev.reason.as_deref().unwrap().contains("dropped=RenderFailed"));
    }

    #[test]
    fn test_render_classification() {
        assert!(Event::new(EventKind::RenderMuted).is_render());
        assert!(!Event::new(EventKind::ActionSettled).is_render());
        let dropped = Event::new(EventKind::RenderMuted);
        assert!(!Event::subscriber_overflow("log", "full", &dropped).is_render());
    }
}
