//! # Result of a submission.
//!
//! [`ProcessResult`] is the submitted action plus every filter result keyed by
//! filter name, plus a [`Completion`] for the renderers. Filter names can never
//! shadow the action's own fields because those names are reserved.

use std::any::Any;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::action::Action;
use crate::completion::Completion;
use crate::item::{Output, Results, StreamItem};

/// What [`Engine::submit`](crate::Engine::submit) returns.
///
/// Only filter results are available by name here. Outputs of renderers
/// registered with `with_process_results(true)` are produced after `submit`
/// returns, so they are read from the [`CompletionReport`](crate::CompletionReport)
/// instead:
///
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use actionvisor::{Action, Engine, Render, RenderFn, StreamItem, SubscriberConfig};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let engine = Engine::new();
/// engine
///     .add_renderer(
///         RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| Render::value(42u32)),
///         SubscriberConfig::named("answer").with_process_results(true),
///     )
///     .unwrap();
///
/// let result = engine.submit(Action::new("Ask")).unwrap();
/// assert_eq!(result.get::<u32>("answer"), None);
///
/// let report = result.completed().await;
/// assert_eq!(report.output::<u32>("answer"), Some(&42));
/// # }
/// ```
#[derive(Clone)]
pub struct ProcessResult {
    item: Arc<StreamItem>,
    completion: Completion,
}

impl ProcessResult {
    pub(crate) fn new(item: Arc<StreamItem>, completion: Completion) -> Self {
        Self { item, completion }
    }

    /// The submitted action, unchanged.
    pub fn action(&self) -> &Action {
        self.item.action()
    }

    pub fn kind(&self) -> &str {
        &self.item.action().kind
    }

    pub fn payload(&self) -> Option<&Value> {
        self.item.action().payload.as_ref()
    }

    pub fn meta(&self) -> Option<&Map<String, Value>> {
        self.item.action().meta.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.item.action().error
    }

    /// Result of filter `name` downcast to `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.item.results().get(name)
    }

    /// Result of filter `name`, type-erased.
    pub fn raw(&self, name: &str) -> Option<&Output> {
        self.item.results().raw(name)
    }

    /// All filter results in filter order.
    pub fn results(&self) -> &Results {
        self.item.results()
    }

    /// The published stream item (the same one renderers received).
    pub fn item(&self) -> &Arc<StreamItem> {
        &self.item
    }

    /// Completion of every renderer this action was dispatched to.
    pub fn completed(&self) -> Completion {
        self.completion.clone()
    }
}

impl std::fmt::Debug for ProcessResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessResult")
            .field("action", self.action())
            .field("results", self.results())
            .field("completion", &self.completion)
            .finish()
    }
}
