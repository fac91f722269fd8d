//! Per-action data carried through the engine.
//!
//! - [`StreamItem`] the action plus filter results and render lifecycle signals
//! - [`Results`] ordered, type-erased handler results
//! - [`Signal`] fire-once lifecycle signal (render beginnings/endings)

#[allow(clippy::module_inception)]
mod item;
mod signal;

pub use item::{Beginning, Context, Ending, Output, Results, StreamItem};
pub use signal::Signal;
