//! # Renderers: asynchronous, concurrency-controlled side effects.
//!
//! A [`Renderer`] is called by its concurrency controller, never by
//! `submit` directly. It returns a [`Render`] describing the invocation:
//!
//! | Variant          | Meaning                                              |
//! |------------------|------------------------------------------------------|
//! | `Render::Done`   | synchronous side effect already done, no value       |
//! | `Render::Value`  | synchronous side effect done, one value              |
//! | `Render::Task`   | long-running future; completes when it resolves     |
//! | `Render::Steps`  | multi-step stream; completes when the stream ends    |
//!
//! Long-running invocations receive a [`CancellationToken`]. The controller
//! also stops polling an invocation as soon as its token fires (cutoff or
//! shutdown), so a renderer that never checks the token is still cancelled at
//! its next suspension point.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use actionvisor::{Render, RenderFn, RendererRef};
//!
//! let speak: RendererRef = RenderFn::arc(|item, _ctx: CancellationToken| {
//!     let words = item.action().kind.clone();
//!     Render::task(async move {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         Ok(words.len())
//!     })
//! });
//! ```

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::item::{Output, StreamItem};

/// Description of one renderer invocation.
pub enum Render {
    /// Nothing to wait for.
    Done,
    /// Immediately complete with a value.
    Value(Output),
    /// Complete when the future resolves.
    Task(BoxFuture<'static, anyhow::Result<Option<Output>>>),
    /// Complete when the stream ends; the last item is the output.
    Steps(BoxStream<'static, anyhow::Result<Output>>),
}

impl Render {
    #[inline]
    pub fn done() -> Self {
        Render::Done
    }

    /// Immediate single value.
    #[inline]
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Render::Value(Arc::new(value))
    }

    /// Long-running invocation resolving to a value.
    pub fn task<Fut, T>(fut: Fut) -> Self
    where
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Any + Send + Sync,
    {
        Render::Task(
            fut.map(|r| r.map(|v| Some(Arc::new(v) as Output)))
                .boxed(),
        )
    }

    /// Multi-step invocation; each item is one step.
    pub fn steps<S, T>(steps: S) -> Self
    where
        S: Stream<Item = anyhow::Result<T>> + Send + 'static,
        T: Any + Send + Sync,
    {
        Render::Steps(steps.map_ok(|v| Arc::new(v) as Output).boxed())
    }
}

impl From<()> for Render {
    fn from(_: ()) -> Self {
        Render::Done
    }
}

impl std::fmt::Debug for Render {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Render::Done => "Done",
            Render::Value(_) => "Value",
            Render::Task(_) => "Task",
            Render::Steps(_) => "Steps",
        };
        f.write_str(name)
    }
}

/// Asynchronous action observer.
pub trait Renderer: Send + Sync + 'static {
    /// Starts one invocation for `item`.
    ///
    /// Called from the renderer's worker task. Keep synchronous work short;
    /// put long work inside [`Render::Task`] or [`Render::Steps`].
    fn render(&self, item: Arc<StreamItem>, ctx: CancellationToken) -> Render;
}

/// Shared handle to a renderer.
pub type RendererRef = Arc<dyn Renderer>;

/// Function-backed renderer.
///
/// Wraps `F: Fn(Arc<StreamItem>, CancellationToken) -> R` where `R: Into<Render>`,
/// so closures may return `()` for fire-and-forget side effects.
pub struct RenderFn<F> {
    f: F,
}

impl<F> RenderFn<F> {
    /// Creates a new function-backed renderer.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the renderer and returns it as a shared handle.
    pub fn arc<R>(f: F) -> Arc<Self>
    where
        F: Fn(Arc<StreamItem>, CancellationToken) -> R + Send + Sync + 'static,
        R: Into<Render>,
    {
        Arc::new(Self::new(f))
    }
}

impl<F, R> Renderer for RenderFn<F>
where
    F: Fn(Arc<StreamItem>, CancellationToken) -> R + Send + Sync + 'static,
    R: Into<Render>,
{
    fn render(&self, item: Arc<StreamItem>, ctx: CancellationToken) -> Render {
        (self.f)(item, ctx).into()
    }
}
