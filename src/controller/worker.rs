//! # Renderer worker: the per-renderer concurrency state machine.
//!
//! Every renderer gets one worker task. The worker owns the renderer's input
//! (an unbounded queue fed by `submit`, optionally reshaped by a transform)
//! and drives a [`Controller`] from three message sources:
//!
//! ```text
//!            ┌─────────────────────── worker loop ───────────────────────┐
//! deliveries │ input.next()        ─► admit(delivery)                    │
//! invocations│ inflight.join_next() ─► finish(result) ─► start next queued│
//! shutdown   │ token.cancelled()   ─► stop(): cancel all, drain queue    │
//!            └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Admission (single-flight policies)
//! ```text
//! status \ policy   Serial          Cutoff                         Mute
//! Idle              start           start                          start
//! Running(id)       queue.push      cancel(id) → Terminating,      drop (Muted)
//!                                   pending = [new]
//! Terminating(id)   -               pending = [new] (old Superseded) -
//! ```
//! `Parallel` bypasses the slot and starts every delivery.
//!
//! The worker exits once its input is closed (renderer unsubscribed) and
//! every queued and in-flight invocation has settled.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::completion::Outcome;
use crate::error::RenderError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::RendererRef;
use crate::item::Output;

use super::concurrency::Concurrency;
use super::delivery::{Delivery, DeliveryStream, StreamTransformer};
use super::runner::run_once;
use super::slot::{Slot, SlotStatus};

/// Result of one spawned invocation.
struct Finished {
    id: u64,
    delivery: Delivery,
    result: Result<Option<Output>, RenderError>,
}

/// Static description of a renderer's worker.
pub(crate) struct WorkerSpec {
    pub name: Arc<str>,
    pub renderer: RendererRef,
    pub concurrency: Concurrency,
    pub process_results: bool,
    pub transform: Option<StreamTransformer>,
}

/// Spawns the worker of one renderer and returns its input sender.
///
/// Must be called inside a tokio runtime.
pub(crate) fn spawn_worker(
    spec: WorkerSpec,
    bus: Bus,
    token: CancellationToken,
) -> (mpsc::UnboundedSender<Delivery>, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let input: DeliveryStream = UnboundedReceiverStream::new(rx).boxed();
    let input = match &spec.transform {
        Some(transform) => transform(input),
        None => input,
    };

    let controller = Controller {
        name: spec.name,
        renderer: spec.renderer,
        concurrency: spec.concurrency,
        process_results: spec.process_results,
        bus,
        slot: Slot::new(),
        inflight: JoinSet::new(),
        tokens: HashMap::new(),
        next_id: 0,
        stopping: false,
    };

    let join = tokio::spawn(run(controller, input, token));
    (tx, join)
}

async fn run(mut ctl: Controller, mut input: DeliveryStream, token: CancellationToken) {
    let mut input_open = true;

    loop {
        if !input_open && ctl.inflight.is_empty() {
            break;
        }

        tokio::select! {
            _ = token.cancelled(), if !ctl.stopping => {
                input_open = false;
                ctl.stop();
            }
            next = input.next(), if input_open => match next {
                Some(delivery) => ctl.admit(delivery),
                None => input_open = false,
            },
            Some(joined) = ctl.inflight.join_next() => ctl.finish(joined),
        }
    }

    debug!(renderer = %ctl.name, "renderer worker exited");
}

/// Concurrency state of one renderer.
struct Controller {
    name: Arc<str>,
    renderer: RendererRef,
    concurrency: Concurrency,
    process_results: bool,
    bus: Bus,

    slot: Slot,
    inflight: JoinSet<Finished>,
    tokens: HashMap<u64, CancellationToken>,
    next_id: u64,
    stopping: bool,
}

impl Controller {
    /// Applies the concurrency policy to a new delivery.
    fn admit(&mut self, delivery: Delivery) {
        match self.concurrency {
            Concurrency::Parallel => {
                self.start(delivery);
            }
            Concurrency::Serial => {
                if self.slot.is_idle() {
                    self.occupy(delivery);
                } else {
                    self.slot.queue.push_back(delivery);
                }
            }
            Concurrency::Mute => {
                if self.slot.is_idle() {
                    self.occupy(delivery);
                } else {
                    self.settle_unrun(delivery, Outcome::Muted);
                }
            }
            Concurrency::Cutoff => match self.slot.status {
                SlotStatus::Idle => self.occupy(delivery),
                SlotStatus::Running { id, started_at } => {
                    if let Some(t) = self.tokens.get(&id) {
                        t.cancel();
                    }
                    debug!(
                        renderer = %self.name,
                        ran_for = ?started_at.elapsed(),
                        "cutting off running invocation"
                    );
                    self.slot.status = SlotStatus::Terminating {
                        id,
                        cancelled_at: Instant::now(),
                    };
                    self.replace_pending(delivery);
                }
                SlotStatus::Terminating { .. } => self.replace_pending(delivery),
            },
        }
    }

    /// Starts `delivery` in the (idle) slot.
    fn occupy(&mut self, delivery: Delivery) {
        let id = self.start(delivery);
        self.slot.status = SlotStatus::Running {
            id,
            started_at: Instant::now(),
        };
    }

    /// Spawns one invocation and returns its id.
    fn start(&mut self, delivery: Delivery) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let token = CancellationToken::new();
        self.tokens.insert(id, token.clone());

        let name = Arc::clone(&self.name);
        let renderer = Arc::clone(&self.renderer);
        let bus = self.bus.clone();

        self.inflight.spawn(async move {
            let result = AssertUnwindSafe(run_once(&name, renderer.as_ref(), &delivery, &token, &bus))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(RenderError::from_panic(panic)));
            Finished {
                id,
                delivery,
                result,
            }
        });
        id
    }

    /// Settles a finished invocation and frees its slot.
    fn finish(&mut self, joined: Result<Finished, JoinError>) {
        let finished = match joined {
            Ok(f) => f,
            Err(e) => {
                // Only reachable if the worker task set was aborted from outside.
                warn!(renderer = %self.name, error = %e, "renderer invocation lost");
                if self.concurrency.is_single_flight() {
                    self.release(None);
                }
                return;
            }
        };

        let Finished {
            id,
            delivery,
            result,
        } = finished;
        self.tokens.remove(&id);

        let (kind, outcome, output) = match result {
            Ok(output) => (EventKind::RenderCompleted, Outcome::Completed, output),
            Err(err) => {
                let outcome = Outcome::from(&err);
                if matches!(err, RenderError::Canceled) {
                    (EventKind::RenderCancelled, outcome, None)
                } else {
                    warn!(
                        renderer = %self.name,
                        action = %delivery.action().kind,
                        seq = delivery.seq(),
                        error = %err,
                        "renderer invocation failed"
                    );
                    (EventKind::RenderFailed, outcome, None)
                }
            }
        };

        let mut ev = self.event(kind, &delivery);
        if let Outcome::Failed { reason } = &outcome {
            ev = ev.with_reason(Arc::clone(reason));
        }
        self.bus.publish(ev);

        let output = if self.process_results { output } else { None };
        delivery.ticket().record(outcome, output);
        drop(delivery);

        if self.concurrency.is_single_flight() {
            self.release(Some(id));
        }
    }

    /// Frees the slot held by `id` (or unconditionally) and starts the next queued delivery.
    fn release(&mut self, id: Option<u64>) {
        let current = self.slot.status.current();
        if id.is_some() && current != id {
            return;
        }
        if let SlotStatus::Terminating { cancelled_at, .. } = self.slot.status {
            debug!(
                renderer = %self.name,
                took = ?cancelled_at.elapsed(),
                "cut off invocation settled"
            );
        }

        self.slot.status = SlotStatus::Idle;
        if self.stopping {
            return;
        }
        if let Some(next) = self.slot.queue.pop_front() {
            self.occupy(next);
        }
    }

    /// Replaces the pending delivery of a cutoff slot.
    fn replace_pending(&mut self, delivery: Delivery) {
        let superseded: Vec<Delivery> = self.slot.queue.drain(..).collect();
        for old in superseded {
            self.settle_unrun(old, Outcome::Superseded);
        }
        self.slot.queue.push_back(delivery);
    }

    /// Cancels every in-flight invocation and settles queued deliveries.
    fn stop(&mut self) {
        self.stopping = true;
        for token in self.tokens.values() {
            token.cancel();
        }
        let queued: Vec<Delivery> = self.slot.queue.drain(..).collect();
        for delivery in queued {
            self.settle_unrun(delivery, Outcome::Skipped);
        }
    }

    /// Settles a delivery that will never be invoked.
    fn settle_unrun(&self, delivery: Delivery, outcome: Outcome) {
        let kind = match outcome {
            Outcome::Muted => Some(EventKind::RenderMuted),
            Outcome::Superseded => Some(EventKind::RenderSuperseded),
            _ => None,
        };
        if let Some(kind) = kind {
            self.bus.publish(self.event(kind, &delivery));
        }
        delivery.ticket().record(outcome, None);
    }

    fn event(&self, kind: EventKind, delivery: &Delivery) -> Event {
        Event::new(kind)
            .with_action(delivery.seq(), delivery.action().kind.as_str())
            .with_subscriber(Arc::clone(&self.name))
    }
}
