//! Per-action completion tracking.
//!
//! - [`Completion`] awaitable returned with every [`ProcessResult`](crate::ProcessResult)
//! - [`CompletionReport`] / [`Settlement`] what each renderer did with the action
//! - [`Outcome`] classification of a renderer's settlement

mod outcome;
mod tracker;

pub use outcome::Outcome;
pub use tracker::{Completion, CompletionReport, Settlement};

pub(crate) use tracker::{Ticket, Tracker};
