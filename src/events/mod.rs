//! Diagnostic events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Engine`, `Registry`, renderer workers, completion trackers,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Engine::events()` receivers and the engine's subscriber
//!   listener (fans out to `SubscriberSet`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
