//! # Subscriber registry: named filters and renderers.
//!
//! The registry is the only state shared across dispatches. `submit` takes a
//! snapshot of it under a short read lock; registration and removal take the
//! write lock, so a change only affects actions dispatched after it completes.
//!
//! ## Rules
//! - Filters and renderers have separate namespaces.
//! - Names must be non-empty, not in [`RESERVED_NAMES`], and unique among active
//!   subscribers of the same kind.
//! - Default names are `<kind>_N`, N being the 1-based count of successful
//!   registrations of that kind.
//! - Removing a renderer drops its input sender: its worker finishes what was
//!   already delivered and exits.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use tokio::sync::mpsc;

use crate::controller::Delivery;
use crate::error::ConfigError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::{ActionMatcher, FilterRef, SubscriberKind};
use crate::item::StreamItem;

/// Names that collide with [`ProcessResult`](crate::ProcessResult) fields.
pub const RESERVED_NAMES: &[&str] = &["type", "payload", "error", "meta", "context", "completed"];

#[derive(Clone)]
pub(crate) struct FilterEntry {
    id: u64,
    pub name: Arc<str>,
    pub filter: FilterRef,
}

#[derive(Clone)]
pub(crate) struct RendererEntry {
    id: u64,
    pub name: Arc<str>,
    matcher: Option<ActionMatcher>,
    tx: mpsc::UnboundedSender<Delivery>,
}

impl RendererEntry {
    pub fn matches(&self, item: &StreamItem) -> bool {
        self.matcher.as_ref().map_or(true, |m| m.matches(item))
    }

    /// Hands a delivery to the renderer's worker.
    ///
    /// If the worker is gone the delivery is dropped, which settles it.
    pub fn deliver(&self, delivery: Delivery) {
        let _ = self.tx.send(delivery);
    }
}

#[derive(Default)]
struct State {
    filters: Vec<FilterEntry>,
    renderers: Vec<RendererEntry>,
    filters_added: usize,
    renderers_added: usize,
    next_id: u64,
}

impl State {
    fn resolve_name(
        &self,
        kind: SubscriberKind,
        requested: Option<String>,
    ) -> Result<Arc<str>, ConfigError> {
        let name = match requested {
            Some(name) => name,
            None => {
                let n = match kind {
                    SubscriberKind::Filter => self.filters_added,
                    SubscriberKind::Renderer => self.renderers_added,
                } + 1;
                format!("{kind}_{n}")
            }
        };

        if name.is_empty() {
            return Err(ConfigError::EmptyName { kind });
        }
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(ConfigError::ReservedName { kind, name });
        }
        let taken = match kind {
            SubscriberKind::Filter => self.filters.iter().any(|f| *f.name == *name),
            SubscriberKind::Renderer => self.renderers.iter().any(|r| *r.name == *name),
        };
        if taken {
            return Err(ConfigError::DuplicateName { kind, name });
        }
        Ok(name.into())
    }
}

/// Registry of active filters and renderers.
pub(crate) struct Registry {
    state: RwLock<State>,
    bus: Bus,
}

impl Registry {
    pub fn new(bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(State::default()),
            bus,
        })
    }

    /// Snapshot of the filters in registration order.
    pub fn filters(&self) -> Vec<FilterEntry> {
        self.read().filters.clone()
    }

    /// Snapshot of the renderers in registration order.
    pub fn renderers(&self) -> Vec<RendererEntry> {
        self.read().renderers.clone()
    }

    pub fn names(&self, kind: SubscriberKind) -> Vec<String> {
        let state = self.read();
        match kind {
            SubscriberKind::Filter => state.filters.iter().map(|f| f.name.to_string()).collect(),
            SubscriberKind::Renderer => state.renderers.iter().map(|r| r.name.to_string()).collect(),
        }
    }

    pub fn add_filter(
        self: &Arc<Self>,
        filter: FilterRef,
        requested: Option<String>,
    ) -> Result<Subscription, ConfigError> {
        let mut state = self.write();
        let name = state.resolve_name(SubscriberKind::Filter, requested)?;

        state.next_id += 1;
        state.filters_added += 1;
        let id = state.next_id;
        state.filters.push(FilterEntry {
            id,
            name: Arc::clone(&name),
            filter,
        });
        drop(state);

        self.bus
            .publish(Event::new(EventKind::FilterAdded).with_subscriber(Arc::clone(&name)));
        Ok(self.subscription(id, SubscriberKind::Filter, name))
    }

    /// Registers a renderer; `start` is called with the resolved name (under
    /// the write lock) and must return the sender of the renderer's worker.
    pub fn add_renderer<S>(
        self: &Arc<Self>,
        requested: Option<String>,
        matcher: Option<ActionMatcher>,
        start: S,
    ) -> Result<Subscription, ConfigError>
    where
        S: FnOnce(Arc<str>) -> mpsc::UnboundedSender<Delivery>,
    {
        let mut state = self.write();
        let name = state.resolve_name(SubscriberKind::Renderer, requested)?;

        state.next_id += 1;
        state.renderers_added += 1;
        let id = state.next_id;
        let tx = start(Arc::clone(&name));
        state.renderers.push(RendererEntry {
            id,
            name: Arc::clone(&name),
            matcher,
            tx,
        });
        drop(state);

        Ok(self.subscription(id, SubscriberKind::Renderer, name))
    }

    /// Removes subscriber `id`. Returns `false` if it was already gone.
    fn remove(&self, kind: SubscriberKind, id: u64) -> bool {
        let mut state = self.write();
        let removed = match kind {
            SubscriberKind::Filter => {
                let pos = state.filters.iter().position(|f| f.id == id);
                pos.map(|i| state.filters.remove(i).name)
            }
            SubscriberKind::Renderer => {
                let pos = state.renderers.iter().position(|r| r.id == id);
                pos.map(|i| state.renderers.remove(i).name)
            }
        };
        drop(state);

        let Some(name) = removed else { return false };
        let kind = match kind {
            SubscriberKind::Filter => EventKind::FilterRemoved,
            SubscriberKind::Renderer => EventKind::RendererRemoved,
        };
        self.bus.publish(Event::new(kind).with_subscriber(name));
        true
    }

    fn contains(&self, kind: SubscriberKind, id: u64) -> bool {
        let state = self.read();
        match kind {
            SubscriberKind::Filter => state.filters.iter().any(|f| f.id == id),
            SubscriberKind::Renderer => state.renderers.iter().any(|r| r.id == id),
        }
    }

    /// Removes every renderer (shutdown). Returns their names.
    pub fn clear_renderers(&self) -> Vec<Arc<str>> {
        let removed: Vec<RendererEntry> = self.write().renderers.drain(..).collect();
        removed.into_iter().map(|r| r.name).collect()
    }

    fn subscription(self: &Arc<Self>, id: u64, kind: SubscriberKind, name: Arc<str>) -> Subscription {
        Subscription {
            id,
            kind,
            name,
            registry: Arc::downgrade(self),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by registration.
///
/// Dropping the handle does **not** unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    kind: SubscriberKind,
    name: Arc<str>,
    registry: Weak<Registry>,
}

impl Subscription {
    /// The registered (possibly generated) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SubscriberKind {
        self.kind
    }

    /// Removes the subscriber. Actions submitted afterwards no longer reach it;
    /// invocations already delivered are unaffected.
    ///
    /// Returns `false` if it was already removed (or the engine is gone).
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|r| r.remove(self.kind, self.id))
    }

    /// True while the subscriber is registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|r| r.contains(self.kind, self.id))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}
