//! # Run a single renderer invocation.
//!
//! ```text
//! ticket.begin() ─► publish RenderStarting ─► renderer.render(item, token)
//!                                                  │
//!      Done / Value ───────────────────────────────┤ immediate
//!      Task(fut) ──── select { fut, token.cancelled() }
//!      Steps(stream) ─ select { drain(stream), token.cancelled() }
//!                                                  ▼
//!                                   Result<Option<Output>, RenderError>
//! ```
//!
//! ## Rules
//! - Panics in the renderer (sync or async part) become `RenderError::Panicked`.
//! - Cancellation wins over completion when both are ready (`biased`).
//! - Settlement (events, ticket) is left to the controller.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::RenderError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::{Render, Renderer};
use crate::item::Output;

use super::delivery::Delivery;

/// Executes one invocation of `renderer` for `delivery`.
pub(super) async fn run_once(
    name: &Arc<str>,
    renderer: &dyn Renderer,
    delivery: &Delivery,
    token: &CancellationToken,
    bus: &Bus,
) -> Result<Option<Output>, RenderError> {
    delivery.ticket().begin();
    bus.publish(
        Event::new(EventKind::RenderStarting)
            .with_action(delivery.seq(), delivery.action().kind.as_str())
            .with_subscriber(Arc::clone(name)),
    );

    let render = std::panic::catch_unwind(AssertUnwindSafe(|| {
        renderer.render(Arc::clone(delivery.item()), token.clone())
    }));

    match render {
        Err(panic) => Err(RenderError::from_panic(panic)),
        Ok(Render::Done) => Ok(None),
        Ok(Render::Value(v)) => Ok(Some(v)),
        Ok(Render::Task(fut)) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(RenderError::Canceled),
                res = AssertUnwindSafe(fut).catch_unwind() => match res {
                    Ok(Ok(v)) => Ok(v),
                    Ok(Err(e)) => Err(RenderError::from_anyhow(&e)),
                    Err(panic) => Err(RenderError::from_panic(panic)),
                },
            }
        }
        Ok(Render::Steps(steps)) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(RenderError::Canceled),
                res = AssertUnwindSafe(drain(steps)).catch_unwind() => match res {
                    Ok(Ok(v)) => Ok(v),
                    Ok(Err(e)) => Err(RenderError::from_anyhow(&e)),
                    Err(panic) => Err(RenderError::from_panic(panic)),
                },
            }
        }
    }
}

/// Runs a multi-step invocation to its end, keeping the last step.
async fn drain(mut steps: BoxStream<'static, anyhow::Result<Output>>) -> anyhow::Result<Option<Output>> {
    let mut last = None;
    while let Some(step) = steps.next().await {
        last = Some(step?);
    }
    Ok(last)
}
