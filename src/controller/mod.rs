//! Per-renderer concurrency control.
//!
//! - [`Concurrency`] the overlap policy (parallel, serial, cutoff, mute)
//! - [`Delivery`] / [`DeliveryStream`] / [`StreamTransformer`] a renderer's input
//! - worker: the per-renderer state machine (idle / running / terminating + queue)
//! - runner: executes one invocation with cancellation and panic capture

mod concurrency;
mod delivery;
mod runner;
mod slot;
mod worker;

pub use concurrency::Concurrency;
pub use delivery::{Delivery, DeliveryStream, StreamTransformer};

pub(crate) use worker::{spawn_worker, WorkerSpec};
