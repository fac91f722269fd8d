//! # actionvisor
//!
//! **Actionvisor** is an in-process action dispatch engine for Rust.
//!
//! Code submits small [`Action`] records ("something happened"). The engine
//! runs every registered [`Filter`] synchronously, in order, collecting their
//! named results, then hands the populated [`StreamItem`] to every matching
//! [`Renderer`]. Renderers perform asynchronous side effects under a
//! per-renderer [`Concurrency`] policy, and the caller can await the moment
//! all of them have settled.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   submit(Action) ────────────────────────────────────────────► ProcessResult
//!        │                                                        ├─ action
//!        ▼                                                        ├─ results[filter]
//! ┌───────────────────────────────────────────────────────┐      └─ completed()
//! │  Engine (dispatch core)                               │             ▲
//! │  - Registry (named filters / renderers)               │             │
//! │  - filters: f1 ─► f2 ─► ... ─► fN  (inline, ordered)   │             │
//! │  - ActionStream (broadcast tap of published items)    │             │
//! │  - Bus (diagnostic events) ─► SubscriberSet           │             │
//! └──────┬──────────────────┬──────────────────┬──────────┘             │
//!        ▼                  ▼                  ▼                        │
//!   [queue r1]         [queue r2]         [queue rN]   (one per renderer)
//!        │ transform?       │                  │                        │
//!        ▼                  ▼                  ▼                        │
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐                  │
//!   │ worker   │       │ worker   │       │ worker   │                  │
//!   │ Parallel │       │ Serial   │       │ Cutoff   │                  │
//!   └────┬─────┘       └────┬─────┘       └────┬─────┘                  │
//!        ▼                  ▼                  ▼                        │
//!   render(item)       render(item)       render(item)                  │
//!        └──────────── settle ticket ─────────┴──► Tracker ─────────────┘
//! ```
//!
//! ### Concurrency policies
//! ```text
//! Parallel : every delivery starts its own invocation
//! Serial   : one at a time, the rest wait in FIFO order
//! Cutoff   : a new delivery cancels the running invocation and replaces it
//! Mute     : deliveries arriving while busy are dropped
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Dispatch**      | Submit actions, read filter results, await renderers.        | [`Engine`], [`ProcessResult`], [`Completion`] |
//! | **Handlers**      | Synchronous filters and asynchronous renderers.             | [`FilterFn`], [`RenderFn`], [`Render`]      |
//! | **Registration**  | Names, concurrency, transforms, action type matching.        | [`SubscriberConfig`], [`Subscription`]      |
//! | **Transforms**    | Reshape a renderer's input (bursts, throttling).             | [`transforms`]                              |
//! | **Subscriber API**| Hook into diagnostic events (logging, metrics).              | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for registration, dispatch and shutdown.        | [`ConfigError`], [`DispatchError`]          |
//! | **Configuration** | Centralize engine settings.                                  | [`EngineConfig`]                            |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use actionvisor::{Action, Concurrency, Engine, FilterFn, Render, RenderFn, StreamItem, SubscriberConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new();
//!
//!     engine.add_filter(
//!         FilterFn::arc(|item: &StreamItem| Ok(item.action().kind.to_uppercase())),
//!         SubscriberConfig::named("shout"),
//!     )?;
//!
//!     engine.add_renderer(
//!         RenderFn::arc(|item, _ctx: CancellationToken| {
//!             let words = item.results().get::<String>("shout").cloned().unwrap_or_default();
//!             Render::task(async move {
//!                 tokio::time::sleep(Duration::from_millis(10)).await;
//!                 println!("{words}");
//!                 Ok(())
//!             })
//!         }),
//!         SubscriberConfig::named("speaker").with_concurrency(Concurrency::Serial),
//!     )?;
//!
//!     let result = engine.submit(Action::new("hello"))?;
//!     assert_eq!(result.get::<String>("shout").map(String::as_str), Some("HELLO"));
//!
//!     let report = result.completed().await;
//!     assert!(report.failures().next().is_none());
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod action;
mod completion;
mod config;
mod controller;
mod core;
mod error;
mod events;
mod handlers;
mod item;
mod subscribers;

pub mod transforms;

// ---- Public re-exports ----

pub use action::Action;
pub use completion::{Completion, CompletionReport, Outcome, Settlement};
pub use config::EngineConfig;
pub use controller::{Concurrency, Delivery, DeliveryStream, StreamTransformer};
pub use self::core::{ActionStream, Engine, EngineBuilder, ProcessResult, Subscription, RESERVED_NAMES};
pub use error::{ConfigError, DispatchError, RenderError, RuntimeError};
pub use events::{Event, EventKind};
pub use handlers::{
    ActionMatcher, Filter, FilterFn, FilterRef, ItemPredicate, Render, RenderFn, Renderer,
    RendererRef, SubscriberConfig, SubscriberKind,
};
pub use item::{Beginning, Context, Ending, Output, Results, Signal, StreamItem};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
