//! # LogWriter: tracing-backed event logger
//!
//! A minimal subscriber that forwards incoming [`Event`]s to `tracing`.
//! Render failures and subscriber trouble log at `warn`, everything else at
//! `info` or `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  renderer added renderer="speaker" concurrency="serial"
//! DEBUG render starting renderer="speaker" action="Speak" seq=3
//! WARN  render failed renderer="speaker" action="Speak" seq=3 reason="render failed: tts offline"
//! DEBUG action settled action="Speak" seq=3
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let subscriber = e.subscriber.as_deref().unwrap_or("-");
        let action = e.action.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        let seq = e.action_seq.unwrap_or_default();

        match e.kind {
            EventKind::FilterAdded => info!(filter = subscriber, "filter added"),
            EventKind::FilterRemoved => info!(filter = subscriber, "filter removed"),
            EventKind::RendererAdded => {
                info!(renderer = subscriber, concurrency = reason, "renderer added")
            }
            EventKind::RendererRemoved => info!(renderer = subscriber, "renderer removed"),
            EventKind::ActionSubmitted => debug!(action, seq, "action submitted"),
            EventKind::ActionSettled => debug!(action, seq, "action settled"),
            EventKind::FilterFailed => {
                warn!(filter = subscriber, action, seq, reason, "filter failed")
            }
            EventKind::RenderStarting => {
                debug!(renderer = subscriber, action, seq, "render starting")
            }
            EventKind::RenderCompleted => {
                debug!(renderer = subscriber, action, seq, "render completed")
            }
            EventKind::RenderFailed => {
                warn!(renderer = subscriber, action, seq, reason, "render failed")
            }
            EventKind::RenderCancelled => {
                debug!(renderer = subscriber, action, seq, "render cancelled")
            }
            EventKind::RenderMuted => debug!(renderer = subscriber, action, seq, "render muted"),
            EventKind::RenderSuperseded => {
                debug!(renderer = subscriber, action, seq, "render superseded")
            }
            EventKind::RenderSkipped => debug!(renderer = subscriber, action, seq, "render skipped"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber, reason, "subscriber panicked")
            }
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::AllStoppedWithin => info!("all renderers stopped within grace"),
            EventKind::GraceExceeded => warn!(stuck = reason, "grace exceeded"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
