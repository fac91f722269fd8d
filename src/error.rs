//! Error types used by the engine and its handlers.
//!
//! - [`ConfigError`] rejected registrations (bad subscriber names, no runtime).
//! - [`DispatchError`] synchronous failures of [`Engine::submit`](crate::Engine::submit).
//! - [`RenderError`] failures of a single renderer invocation (never surfaced to callers).
//! - [`RuntimeError`] failures of the engine runtime itself (shutdown).
//!
//! All of them provide `as_label` (stable snake_case label for logs/metrics).

use std::time::Duration;
use thiserror::Error;

use crate::handlers::SubscriberKind;

/// # Errors raised when registering a filter or renderer.
///
/// Nothing is registered when one of these is returned.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An explicitly empty name was given.
    #[error("{kind} name must not be empty")]
    EmptyName {
        /// Kind of subscriber being registered.
        kind: SubscriberKind,
    },

    /// The name collides with a field of [`ProcessResult`](crate::ProcessResult).
    #[error("{kind} name '{name}' is reserved")]
    ReservedName {
        /// Kind of subscriber being registered.
        kind: SubscriberKind,
        /// The rejected name.
        name: String,
    },

    /// Another active subscriber of the same kind already uses the name.
    #[error("{kind} name '{name}' is already registered")]
    DuplicateName {
        /// Kind of subscriber being registered.
        kind: SubscriberKind,
        /// The rejected name.
        name: String,
    },

    /// A renderer was registered outside a tokio runtime, so its worker cannot start.
    #[error("renderers must be registered inside a tokio runtime")]
    NoRuntime,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::EmptyName { .. } => "config_empty_name",
            ConfigError::ReservedName { .. } => "config_reserved_name",
            ConfigError::DuplicateName { .. } => "config_duplicate_name",
            ConfigError::NoRuntime => "config_no_runtime",
        }
    }
}

/// # Errors returned synchronously by `submit`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The action has an empty `type`.
    #[error("action type must not be empty")]
    MissingType,

    /// A filter returned an error; later filters and publication were skipped.
    #[error("filter '{filter}' failed: {error}")]
    FilterFailed {
        /// Name of the failing filter.
        filter: String,
        /// Rendered error chain.
        error: String,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use actionvisor::DispatchError;
    ///
    /// assert_eq!(DispatchError::MissingType.as_label(), "dispatch_missing_type");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::MissingType => "dispatch_missing_type",
            DispatchError::FilterFailed { .. } => "dispatch_filter_failed",
        }
    }
}

/// # Errors produced by a single renderer invocation.
///
/// Captured by the concurrency controller and recorded in the
/// [`CompletionReport`](crate::CompletionReport); never propagated to callers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The invocation returned an error.
    #[error("render failed: {error}")]
    Failed {
        /// Rendered error chain.
        error: String,
    },

    /// The renderer panicked.
    #[error("render panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// The invocation was cancelled (cutoff or shutdown).
    #[error("render cancelled")]
    Canceled,
}

impl RenderError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RenderError::Failed { .. } => "render_failed",
            RenderError::Panicked { .. } => "render_panicked",
            RenderError::Canceled => "render_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RenderError::Failed { error } => format!("error: {error}"),
            RenderError::Panicked { info } => format!("panic: {info}"),
            RenderError::Canceled => "cancelled".to_string(),
        }
    }

    pub(crate) fn from_anyhow(err: &anyhow::Error) -> Self {
        RenderError::Failed {
            error: format!("{err:#}"),
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        RenderError::Panicked { info }
    }
}

/// # Errors produced by the engine runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some renderer workers were still busy.
    #[error("shutdown timeout {grace:?} exceeded; stuck renderers: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Renderers whose workers did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payloads_are_rendered() {
        let err = RenderError::from_panic(Box::new("boom"));
        assert_eq!(err, RenderError::Panicked { info: "boom".into() });

        let err = RenderError::from_panic(Box::new(String::from("kaboom")));
        assert_eq!(err.as_message(), "panic: kaboom");

        let err = RenderError::from_panic(Box::new(42_u8));
        assert_eq!(err.as_label(), "render_panicked");
    }

    #[test]
    fn test_anyhow_chain_is_kept() {
        let err = anyhow::anyhow!("disk full").context("append failed");
        let err = RenderError::from_anyhow(&err);
        assert_eq!(
            err,
            RenderError::Failed {
                error: "append failed: disk full".into()
            }
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ReservedName {
            kind: SubscriberKind::Filter,
            name: "type".into(),
        };
        assert_eq!(err.to_string(), "filter name 'type' is reserved");
        assert_eq!(err.as_label(), "config_reserved_name");
    }
}
