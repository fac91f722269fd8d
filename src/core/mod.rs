//! Dispatch core: the engine and its shared state.
//!
//! The public API from this module is [`Engine`] (with [`EngineBuilder`]),
//! what it returns ([`ProcessResult`], [`Subscription`]) and the
//! [`ActionStream`] tap.
//!
//! Internal modules:
//! - [`engine`]: `submit`, registration, shutdown;
//! - [`registry`]: named filters and renderers;
//! - [`gate`]: per-engine reentrant dispatch ordering;
//! - [`stream`]: broadcast tap of published items;
//! - [`result`]: what `submit` returns.

mod builder;
mod engine;
mod gate;
mod registry;
mod result;
mod stream;

#[cfg(test)]
mod tests;

pub use builder::EngineBuilder;
pub use engine::Engine;
pub use registry::{Subscription, RESERVED_NAMES};
pub use result::ProcessResult;
pub use stream::ActionStream;
