//! # Engine: dispatch core, registration surface and graceful shutdown.
//!
//! ```text
//! submit(action)
//!   │ type missing? ─► Err(MissingType)
//!   ├─► gate.enter()                      (per-engine order, reentrant)
//!   ├─► StreamItem{seq, action, context}
//!   ├─► matching renderers ─► attach beginning/ending signals
//!   ├─► filters in order ── Err ─► publish FilterFailed ─► Err(FilterFailed)
//!   │        └─ Ok(v) ─► results[name] = v
//!   ├─► Tracker(expected = matching renderers) + one Ticket each
//!   ├─► ActionStream.publish(item)         (external tap)
//!   ├─► worker_i.send(Delivery{item, ticket_i})
//!   └─► Ok(ProcessResult{item, completion})
//!
//! renderer workers ── Render* events ──► Bus ──► listener ──► SubscriberSet
//!
//! shutdown()
//!   ├─► publish ShutdownRequested
//!   ├─► drop renderer inputs, runtime_token.cancel()
//!   └─► wait workers (grace) ─► AllStoppedWithin | GraceExceeded (abort stuck)
//! ```
//!
//! `submit` never awaits: filters run inline and renderers run on their own
//! worker tasks.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::action::Action;
use crate::completion::{Completion, Ticket, Tracker};
use crate::config::EngineConfig;
use crate::controller::{spawn_worker, Delivery, WorkerSpec};
use crate::error::{ConfigError, DispatchError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::{FilterRef, RendererRef, SubscriberConfig, SubscriberKind};
use crate::item::{Context, StreamItem};
use crate::subscribers::SubscriberSet;

use super::builder::EngineBuilder;
use super::gate::DispatchGate;
use super::registry::{Registry, Subscription};
use super::result::ProcessResult;
use super::stream::ActionStream;

/// The action dispatch engine.
///
/// Cheap to clone; clones share the same registry and stream.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    cfg: EngineConfig,
    bus: Bus,
    registry: Arc<Registry>,
    stream: ActionStream,
    gate: DispatchGate,
    seq: AtomicU64,
    runtime_token: CancellationToken,
    listener_token: CancellationToken,
    workers: Mutex<Vec<(Arc<str>, JoinHandle<()>)>>,
}

impl Engine {
    /// Creates an engine with [`EngineConfig::default`] and no diagnostic subscribers.
    pub fn new() -> Self {
        EngineBuilder::new(EngineConfig::default()).build()
    }

    /// Starts building an engine with the given configuration.
    pub fn builder(cfg: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    pub(super) fn from_parts(
        cfg: EngineConfig,
        bus: Bus,
        subs: Option<SubscriberSet>,
    ) -> Self {
        let listener_token = CancellationToken::new();
        if let Some(subs) = subs {
            spawn_listener(bus.subscribe(), subs, listener_token.clone());
        }

        Self {
            inner: Arc::new(Inner {
                registry: Registry::new(bus.clone()),
                stream: ActionStream::new(cfg.stream_capacity_clamped()),
                gate: DispatchGate::default(),
                seq: AtomicU64::new(0),
                runtime_token: CancellationToken::new(),
                listener_token,
                workers: Mutex::new(Vec::new()),
                cfg,
                bus,
            }),
        }
    }

    /// Dispatches `action` through the filters and to every matching renderer.
    pub fn submit(&self, action: Action) -> Result<ProcessResult, DispatchError> {
        self.dispatch(action, None)
    }

    /// Like [`submit`](Self::submit), with a context value visible to filters
    /// and renderers through [`StreamItem::context`].
    pub fn submit_with_context<C>(
        &self,
        action: Action,
        context: C,
    ) -> Result<ProcessResult, DispatchError>
    where
        C: Any + Send + Sync,
    {
        self.dispatch(action, Some(Arc::new(context) as Context))
    }

    fn dispatch(
        &self,
        action: Action,
        context: Option<Context>,
    ) -> Result<ProcessResult, DispatchError> {
        if action.kind.is_empty() {
            return Err(DispatchError::MissingType);
        }

        let inner = &*self.inner;
        let _gate = inner.gate.enter();

        let seq = inner.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let kind: Arc<str> = Arc::from(action.kind.as_str());
        let mut item = StreamItem::new(seq, action, context);

        let mut renderers = Vec::new();
        for renderer in inner.registry.renderers() {
            if renderer.matches(&item) {
                let (begin, end) = item.attach_renderer(&renderer.name);
                renderers.push((renderer, begin, end));
            }
        }

        for entry in inner.registry.filters() {
            match entry.filter.apply(&item) {
                Ok(value) => item.results_mut().insert(Arc::clone(&entry.name), value),
                Err(err) => {
                    let error = format!("{err:#}");
                    warn!(filter = %entry.name, action = %kind, seq, %error, "filter failed");
                    inner.bus.publish(
                        Event::new(EventKind::FilterFailed)
                            .with_action(seq, kind)
                            .with_subscriber(Arc::clone(&entry.name))
                            .with_reason(error.as_str()),
                    );
                    return Err(DispatchError::FilterFailed {
                        filter: entry.name.to_string(),
                        error,
                    });
                }
            }
        }

        let tracker = Tracker::new(seq, Arc::clone(&kind), renderers.len(), inner.bus.clone());
        let item = Arc::new(item);
        inner.stream.publish(Arc::clone(&item));

        debug!(
            engine = inner.cfg.id.as_deref(),
            action = %kind,
            seq,
            renderers = renderers.len(),
            "action dispatched"
        );
        inner
            .bus
            .publish(Event::new(EventKind::ActionSubmitted).with_action(seq, kind));

        for (renderer, begin, end) in renderers {
            let ticket = Ticket::new(Arc::clone(&renderer.name), Arc::clone(&tracker), begin, end);
            renderer.deliver(Delivery::new(Arc::clone(&item), ticket));
        }

        Ok(ProcessResult::new(item, Completion::new(tracker)))
    }

    /// Registers a filter. Renderer-only options in `cfg` are ignored.
    pub fn add_filter(
        &self,
        filter: FilterRef,
        cfg: SubscriberConfig,
    ) -> Result<Subscription, ConfigError> {
        if cfg.has_renderer_options() {
            debug!(config = ?cfg, "renderer options ignored for filter");
        }
        self.inner.registry.add_filter(filter, cfg.name)
    }

    /// Registers a renderer and starts its worker.
    ///
    /// Returns [`ConfigError::NoRuntime`] outside a tokio runtime.
    pub fn add_renderer(
        &self,
        renderer: RendererRef,
        cfg: SubscriberConfig,
    ) -> Result<Subscription, ConfigError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ConfigError::NoRuntime);
        }

        let inner = &*self.inner;
        let SubscriberConfig {
            name,
            concurrency,
            transform,
            process_results,
            actions_of_type,
        } = cfg;

        let sub = inner.registry.add_renderer(name, actions_of_type, |name| {
            let spec = WorkerSpec {
                name: Arc::clone(&name),
                renderer,
                concurrency,
                process_results,
                transform,
            };
            let (tx, join) = spawn_worker(spec, inner.bus.clone(), inner.runtime_token.child_token());

            let mut workers = inner.workers.lock().unwrap_or_else(PoisonError::into_inner);
            workers.retain(|(_, h)| !h.is_finished());
            workers.push((name, join));
            tx
        })?;

        inner.bus.publish(
            Event::new(EventKind::RendererAdded)
                .with_subscriber(sub.name())
                .with_reason(concurrency.as_label()),
        );
        Ok(sub)
    }

    /// Tap on every published item.
    pub fn action_stream(&self) -> ActionStream {
        self.inner.stream.clone()
    }

    /// Names of the active filters, in execution order.
    pub fn filter_names(&self) -> Vec<String> {
        self.inner.registry.names(SubscriberKind::Filter)
    }

    /// Names of the active renderers, in registration order.
    pub fn renderer_names(&self) -> Vec<String> {
        self.inner.registry.names(SubscriberKind::Renderer)
    }

    /// Receiver of diagnostic events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Identity given in [`EngineConfig::id`], if any.
    pub fn id(&self) -> Option<&str> {
        self.inner.cfg.id.as_deref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.cfg
    }

    /// Stops every renderer and waits for their workers within `grace`.
    ///
    /// In-flight invocations are cancelled and queued deliveries settle as
    /// skipped. Workers still running after the grace period are aborted and
    /// reported in [`RuntimeError::GraceExceeded`]. Filters stay registered;
    /// renderers added afterwards stop immediately.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let inner = &*self.inner;
        inner.bus.publish(Event::new(EventKind::ShutdownRequested));

        let removed = inner.registry.clear_renderers();
        inner.runtime_token.cancel();
        debug!(renderers = removed.len(), "shutting down renderer workers");

        let mut workers = std::mem::take(
            &mut *inner.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let grace = inner.cfg.grace;
        let done = async {
            for (_, join) in workers.iter_mut() {
                let _ = join.await;
            }
        };

        let waited = tokio::time::timeout(grace, done).await;
        let res = match waited {
            Ok(()) => {
                inner.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let mut stuck = Vec::new();
                for (name, join) in &workers {
                    if !join.is_finished() {
                        join.abort();
                        stuck.push(name.to_string());
                    }
                }
                warn!(?grace, ?stuck, "renderers did not stop within grace");
                inner.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        };

        inner.listener_token.cancel();
        res
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.id())
            .field("filters", &self.filter_names())
            .field("renderers", &self.renderer_names())
            .finish()
    }
}

/// Forwards bus events to the subscriber set until the engine shuts down
/// (or every bus sender is gone).
fn spawn_listener(
    mut rx: broadcast::Receiver<Event>,
    subs: SubscriberSet,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => subs.emit(ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged behind the event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = token.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        subs.emit(ev);
                    }
                    break;
                }
            }
        }
        subs.shutdown().await;
    });
}
