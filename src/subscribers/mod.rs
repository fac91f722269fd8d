//! # Diagnostic event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out for handling engine events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ```text
//! Event flow:
//!   Engine / workers ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                   │
//!                                                      ┌────────────┼───────────┐
//!                                                      ▼            ▼           ▼
//!                                                  LogWriter     Metrics     Custom
//! ```
//!
//! These are observability hooks. Filters and renderers (the things actions
//! are dispatched to) live in [`handlers`](crate::handlers).

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
