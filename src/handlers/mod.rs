//! # Handlers: what actions are dispatched to.
//!
//! - [`Filter`] / [`FilterFn`] synchronous observers with named results
//! - [`Renderer`] / [`RenderFn`] / [`Render`] asynchronous side effects
//! - [`SubscriberConfig`] / [`ActionMatcher`] registration options
//! - [`SubscriberKind`] filter vs renderer namespace

mod config;
mod filter;
mod renderer;

pub use config::{ActionMatcher, ItemPredicate, SubscriberConfig, SubscriberKind};
pub use filter::{Filter, FilterFn, FilterRef};
pub use renderer::{Render, RenderFn, Renderer, RendererRef};
