use std::sync::Arc;

use crate::error::RenderError;

/// How one renderer's contribution to an action settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The invocation ran to completion.
    Completed,

    /// The invocation returned an error or panicked.
    Failed {
        /// Human-readable failure.
        reason: Arc<str>,
    },

    /// The invocation was cancelled while in flight (cutoff or shutdown).
    Cancelled,

    /// Dropped because another invocation was in flight (mute).
    Muted,

    /// Replaced by a newer request before it could start (cutoff).
    Superseded,

    /// Never reached the controller (dropped by a transform, renderer
    /// unsubscribed before delivery, or the engine shut down).
    Skipped,
}

impl Outcome {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Failed { .. } => "failed",
            Outcome::Cancelled => "cancelled",
            Outcome::Muted => "muted",
            Outcome::Superseded => "superseded",
            Outcome::Skipped => "skipped",
        }
    }

    /// True if the renderer was actually invoked.
    pub fn was_invoked(&self) -> bool {
        matches!(
            self,
            Outcome::Completed | Outcome::Failed { .. } | Outcome::Cancelled
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl From<&RenderError> for Outcome {
    fn from(err: &RenderError) -> Self {
        match err {
            RenderError::Canceled => Outcome::Cancelled,
            other => Outcome::Failed {
                reason: other.to_string().into(),
            },
        }
    }
}
