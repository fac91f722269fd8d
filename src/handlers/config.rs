//! # Registration options for filters and renderers.
//!
//! [`SubscriberConfig`] bundles the options accepted by
//! [`Engine::add_filter`](crate::Engine::add_filter) and
//! [`Engine::add_renderer`](crate::Engine::add_renderer).
//!
//! | Option            | Filters | Renderers | Default          |
//! |-------------------|---------|-----------|------------------|
//! | `name`            | yes     | yes       | `<kind>_N`       |
//! | `concurrency`     | -       | yes       | `Parallel`       |
//! | `transform`       | -       | yes       | none             |
//! | `process_results` | -       | yes       | `false`          |
//! | `actions_of_type` | -       | yes       | every action     |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use actionvisor::{transforms, Concurrency, SubscriberConfig};
//!
//! let cfg = SubscriberConfig::named("speaker")
//!     .with_concurrency(Concurrency::Serial)
//!     .with_actions_of_type("Speak")
//!     .with_transform(transforms::throttle(Duration::from_millis(200)));
//! assert_eq!(cfg.name.as_deref(), Some("speaker"));
//! ```

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::controller::{Concurrency, StreamTransformer};
use crate::item::StreamItem;

/// Kind of registered handler; each kind has its own namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriberKind {
    Filter,
    Renderer,
}

impl SubscriberKind {
    /// Prefix of generated default names (`filter_1`, `renderer_3`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberKind::Filter => "filter",
            SubscriberKind::Renderer => "renderer",
        }
    }
}

impl fmt::Display for SubscriberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate over a stream item.
pub type ItemPredicate = Arc<dyn Fn(&StreamItem) -> bool + Send + Sync>;

/// Selects which actions a renderer is dispatched.
#[derive(Clone)]
pub enum ActionMatcher {
    /// Exact match on the action type.
    Type(String),
    /// Regular expression search on the action type.
    Pattern(Regex),
    /// Arbitrary predicate over the item (evaluated before filters run).
    Predicate(ItemPredicate),
}

impl ActionMatcher {
    /// Builds a predicate matcher.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&StreamItem) -> bool + Send + Sync + 'static,
    {
        ActionMatcher::Predicate(Arc::new(f))
    }

    pub fn matches(&self, item: &StreamItem) -> bool {
        match self {
            ActionMatcher::Type(kind) => item.action().kind == *kind,
            ActionMatcher::Pattern(re) => re.is_match(&item.action().kind),
            ActionMatcher::Predicate(f) => f(item),
        }
    }
}

impl From<&str> for ActionMatcher {
    fn from(kind: &str) -> Self {
        ActionMatcher::Type(kind.to_string())
    }
}

impl From<String> for ActionMatcher {
    fn from(kind: String) -> Self {
        ActionMatcher::Type(kind)
    }
}

impl From<Regex> for ActionMatcher {
    fn from(re: Regex) -> Self {
        ActionMatcher::Pattern(re)
    }
}

impl fmt::Debug for ActionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionMatcher::Type(kind) => f.debug_tuple("Type").field(kind).finish(),
            ActionMatcher::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            ActionMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Options for registering a filter or renderer.
#[derive(Clone, Default)]
pub struct SubscriberConfig {
    /// Registered name (`<kind>_N` when `None`).
    pub name: Option<String>,
    /// Overlap policy of the renderer's invocations.
    pub concurrency: Concurrency,
    /// Stream-to-stream function applied before the concurrency controller.
    pub transform: Option<StreamTransformer>,
    /// Keep the invocation's output in the completion report.
    pub process_results: bool,
    /// Restricts the renderer to matching actions.
    pub actions_of_type: Option<ActionMatcher>,
}

impl SubscriberConfig {
    /// Config with an explicit name and defaults otherwise.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[inline]
    pub fn with_transform(mut self, transform: StreamTransformer) -> Self {
        self.transform = Some(transform);
        self
    }

    #[inline]
    pub fn with_process_results(mut self, enabled: bool) -> Self {
        self.process_results = enabled;
        self
    }

    #[inline]
    pub fn with_actions_of_type(mut self, matcher: impl Into<ActionMatcher>) -> Self {
        self.actions_of_type = Some(matcher.into());
        self
    }

    /// True if any renderer-only option differs from its default.
    pub(crate) fn has_renderer_options(&self) -> bool {
        self.concurrency != Concurrency::Parallel
            || self.transform.is_some()
            || self.process_results
            || self.actions_of_type.is_some()
    }
}

impl fmt::Debug for SubscriberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberConfig")
            .field("name", &self.name)
            .field("concurrency", &self.concurrency)
            .field("transform", &self.transform.is_some())
            .field("process_results", &self.process_results)
            .field("actions_of_type", &self.actions_of_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Action;

    fn item(kind: &str) -> StreamItem {
        StreamItem::new(1, Action::new(kind), None)
    }

    #[test]
    fn test_type_matcher_is_exact() {
        let m = ActionMatcher::from("File.append");
        assert!(m.matches(&item("File.append")));
        assert!(!m.matches(&item("File.append.later")));
    }

    #[test]
    fn test_pattern_matcher_searches() {
        let m = ActionMatcher::from(Regex::new(r"^File\.").unwrap());
        assert!(m.matches(&item("File.append")));
        assert!(!m.matches(&item("Speak")));
    }

    #[test]
    fn test_predicate_matcher() {
        let m = ActionMatcher::predicate(|item| item.action().error);
        assert!(!m.matches(&item("any")));
        assert!(m.matches(&StreamItem::new(2, Action::new("any").as_error(), None)));
    }

    #[test]
    fn test_renderer_only_options_are_detected() {
        assert!(!SubscriberConfig::named("x").has_renderer_options());
        assert!(SubscriberConfig::default()
            .with_concurrency(Concurrency::Mute)
            .has_renderer_options());
        assert!(SubscriberConfig::default()
            .with_actions_of_type("x")
            .has_renderer_options());
    }
}
