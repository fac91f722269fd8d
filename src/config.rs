//! # Engine configuration.
//!
//! Provides [`EngineConfig`], the centralized settings for an [`Engine`](crate::Engine).
//!
//! ## Sentinel values
//! - `stream_capacity = 0` / `bus_capacity = 0` → clamped to 1
//! - `grace = 0s` → shutdown does not wait for renderers at all

use std::time::Duration;

/// Runtime settings for an engine instance.
///
/// ## Field semantics
/// - `id`: optional read-only identity of the engine (e.g. a short hex tag)
/// - `stream_capacity`: ring buffer size of the action stream tap
/// - `bus_capacity`: ring buffer size of the diagnostic event bus
/// - `grace`: maximum wait for renderer workers on shutdown
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Identity of this engine, exposed through [`Engine::id`](crate::Engine::id)
    /// and attached to its dispatch logs. Never interpreted by the engine.
    pub id: Option<String>,

    /// Capacity of the action stream broadcast channel.
    ///
    /// External taps that fall further behind than this observe `Lagged` and
    /// skip older items. Renderer pipelines are not affected.
    pub stream_capacity: usize,

    /// Capacity of the diagnostic event bus.
    pub bus_capacity: usize,

    /// Maximum time [`Engine::shutdown`](crate::Engine::shutdown) waits for
    /// in-flight renderer invocations to wind down.
    pub grace: Duration,
}

impl EngineConfig {
    /// Returns the action stream capacity clamped to a minimum of 1.
    #[inline]
    pub fn stream_capacity_clamped(&self) -> usize {
        self.stream_capacity.max(1)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `id = None`
    /// - `stream_capacity = 1024`
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            id: None,
            stream_capacity: 1024,
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}
