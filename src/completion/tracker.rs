//! # Completion tracking: one awaitable per submitted action.
//!
//! For every renderer an action is dispatched to, the dispatch core issues a
//! [`Ticket`]. The ticket travels with the delivery through the renderer's
//! transform and concurrency controller. The renderer's contribution settles
//! when the **last clone of its delivery is dropped**:
//!
//! ```text
//! submit() ── Tracker::new(n) ──► n × Ticket ──► Delivery ──► transform ──► controller
//!                                                   │              │              │
//!                                   dropped (filter)┘   dropped ───┘   record() + drop
//!                                                   ▼              ▼              ▼
//!                                              Skipped        Muted/Superseded  Completed/Failed/Cancelled
//!                                                   └──────────────┴──────► Tracker::settle()
//!                                                                            (pending -= 1)
//! ```
//!
//! ## Rules
//! - Settlement is driven by `Drop`, so a delivery can never be lost without settling.
//! - The controller records the outcome before dropping; unrecorded drops settle as `Skipped`.
//! - The awaitable never fails: renderer errors are recorded, not propagated.
//! - With zero tickets the awaitable resolves immediately.

use std::future::IntoFuture;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::events::{Bus, Event, EventKind};
use crate::item::{Beginning, Ending, Output};

use super::outcome::Outcome;

/// Settlement of one renderer's contribution to an action.
#[derive(Clone)]
pub struct Settlement {
    /// Renderer name.
    pub renderer: Arc<str>,
    /// How it settled.
    pub outcome: Outcome,
    /// The invocation's output (only kept for renderers with `process_results`).
    pub output: Option<Output>,
}

impl std::fmt::Debug for Settlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settlement")
            .field("renderer", &self.renderer)
            .field("outcome", &self.outcome)
            .field("has_output", &self.output.is_some())
            .finish()
    }
}

/// Everything that happened to one action once all its renderers settled.
#[derive(Clone, Debug, Default)]
pub struct CompletionReport {
    settlements: Vec<Settlement>,
}

impl CompletionReport {
    /// Settlements in the order they happened.
    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    /// Outcome of renderer `name`, if the action was dispatched to it.
    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.find(name).map(|s| &s.outcome)
    }

    /// Output of renderer `name` downcast to `T` (requires `process_results`).
    pub fn output<T: std::any::Any>(&self, name: &str) -> Option<&T> {
        self.find(name)
            .and_then(|s| s.output.as_ref())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Settlements whose invocation failed.
    pub fn failures(&self) -> impl Iterator<Item = &Settlement> {
        self.settlements.iter().filter(|s| s.outcome.is_failure())
    }

    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }

    fn find(&self, name: &str) -> Option<&Settlement> {
        self.settlements.iter().find(|s| s.renderer.as_ref() == name)
    }
}

/// Per-action aggregator of renderer settlements.
pub(crate) struct Tracker {
    seq: u64,
    kind: Arc<str>,
    pending: watch::Sender<usize>,
    settlements: Mutex<Vec<Settlement>>,
    bus: Bus,
}

impl Tracker {
    /// Creates a tracker expecting `expected` settlements.
    pub(crate) fn new(seq: u64, kind: Arc<str>, expected: usize, bus: Bus) -> Arc<Self> {
        let (pending, _rx) = watch::channel(expected);
        Arc::new(Self {
            seq,
            kind,
            pending,
            settlements: Mutex::new(Vec::with_capacity(expected)),
            bus,
        })
    }

    fn settle(&self, settlement: Settlement) {
        if settlement.outcome == Outcome::Skipped {
            self.bus.publish(
                Event::new(EventKind::RenderSkipped)
                    .with_action(self.seq, Arc::clone(&self.kind))
                    .with_subscriber(Arc::clone(&settlement.renderer)),
            );
        }

        self.settlements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(settlement);

        let mut remaining = 0;
        self.pending.send_modify(|n| {
            *n = n.saturating_sub(1);
            remaining = *n;
        });

        if remaining == 0 {
            self.bus.publish(
                Event::new(EventKind::ActionSettled)
                    .with_action(self.seq, Arc::clone(&self.kind)),
            );
        }
    }

    fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    async fn wait(&self) -> CompletionReport {
        let mut rx = self.pending.subscribe();
        // The sender lives in `self`, so this can only end by reaching zero.
        let _ = rx.wait_for(|n| *n == 0).await;

        let settlements = self
            .settlements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        CompletionReport { settlements }
    }
}

/// One renderer's claim on an action's completion.
pub(crate) struct Ticket {
    renderer: Arc<str>,
    tracker: Arc<Tracker>,
    begin: Beginning,
    end: Ending,
    recorded: Mutex<Option<(Outcome, Option<Output>)>>,
}

impl Ticket {
    pub(crate) fn new(
        renderer: Arc<str>,
        tracker: Arc<Tracker>,
        begin: Beginning,
        end: Ending,
    ) -> Self {
        Self {
            renderer,
            tracker,
            begin,
            end,
            recorded: Mutex::new(None),
        }
    }

    /// Fires the beginning signal.
    pub(crate) fn begin(&self) {
        self.begin.fire(Instant::now());
    }

    /// Records how the renderer's contribution ended.
    ///
    /// Invoked outcomes also fire the ending signal. The settlement itself
    /// happens when the ticket is dropped.
    pub(crate) fn record(&self, outcome: Outcome, output: Option<Output>) {
        if outcome.was_invoked() {
            self.end.fire(outcome.clone());
        }
        *self.recorded.lock().unwrap_or_else(PoisonError::into_inner) = Some((outcome, output));
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let (outcome, output) = self
            .recorded
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or((Outcome::Skipped, None));

        self.begin.close();
        self.end.close();
        self.tracker.settle(Settlement {
            renderer: Arc::clone(&self.renderer),
            outcome,
            output,
        });
    }
}

/// Awaitable completion of one submitted action.
///
/// Resolves to a [`CompletionReport`] once every renderer the action was
/// dispatched to has settled. Never fails. Can be awaited directly:
///
/// ```rust,no_run
/// # async fn demo(engine: actionvisor::Engine) -> Result<(), actionvisor::DispatchError> {
/// let result = engine.submit(actionvisor::Action::new("any"))?;
/// let report = result.completed().await;
/// assert!(report.failures().next().is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Completion {
    tracker: Arc<Tracker>,
}

impl Completion {
    pub(crate) fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    /// Waits until every renderer settled.
    pub async fn wait(&self) -> CompletionReport {
        self.tracker.wait().await
    }

    /// True once every renderer settled.
    pub fn is_settled(&self) -> bool {
        self.tracker.pending() == 0
    }

    /// Number of renderers that have not settled yet.
    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }
}

impl IntoFuture for Completion {
    type Output = CompletionReport;
    type IntoFuture = BoxFuture<'static, CompletionReport>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.tracker.wait().await })
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("seq", &self.tracker.seq)
            .field("pending", &self.pending())
            .finish()
    }
}
