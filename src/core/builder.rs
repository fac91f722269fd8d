use std::sync::Arc;

use crate::config::EngineConfig;
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::engine::Engine;

/// Builder for constructing an [`Engine`] with optional diagnostic subscribers.
pub struct EngineBuilder {
    cfg: EngineConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive diagnostic events (registration, render lifecycle,
    /// failures) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the engine.
    ///
    /// Must be called inside a tokio runtime when subscribers are set.
    pub fn build(self) -> Engine {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = (!self.subscribers.is_empty())
            .then(|| SubscriberSet::new(self.subscribers, bus.clone()));
        Engine::from_parts(self.cfg, bus, subs)
    }
}
