use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::action::Action;
use crate::completion::Outcome;

use super::signal::Signal;

/// A handler result, stored by identity (never copied or serialized).
pub type Output = Arc<dyn Any + Send + Sync>;

/// Caller-supplied context, opaque to the engine.
pub type Context = Arc<dyn Any + Send + Sync>;

/// Fires with the instant an invocation began.
pub type Beginning = Arc<Signal<Instant>>;

/// Fires with the outcome of a settled invocation.
pub type Ending = Arc<Signal<Outcome>>;

/// Ordered mapping from handler name to its result.
///
/// Insertion order is filter registration order.
#[derive(Clone, Default)]
pub struct Results {
    entries: Vec<(Arc<str>, Output)>,
}

impl Results {
    /// Returns the result of `name` downcast to `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.raw(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns the type-erased result of `name`.
    pub fn raw(&self, name: &str) -> Option<&Output> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.raw(name).is_some()
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Output)> {
        self.entries.iter().map(|(n, v)| (n.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, name: Arc<str>, value: Output) {
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }
}

impl fmt::Debug for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// The per-action carrier seen by filters and renderers.
///
/// Built by the dispatch core, filled in by the filter pipeline, then shared
/// read-only (`Arc<StreamItem>`) with every renderer and action stream tap.
pub struct StreamItem {
    seq: u64,
    submitted_at: Instant,
    action: Action,
    context: Option<Context>,
    results: Results,
    beginnings: HashMap<Arc<str>, Beginning>,
    endings: HashMap<Arc<str>, Ending>,
}

impl StreamItem {
    pub(crate) fn new(seq: u64, action: Action, context: Option<Context>) -> Self {
        Self {
            seq,
            submitted_at: Instant::now(),
            action,
            context,
            results: Results::default(),
            beginnings: HashMap::new(),
            endings: HashMap::new(),
        }
    }

    /// Per-engine submission sequence number (monotonic).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// The caller-supplied context downcast to `T`.
    pub fn context<T: Any>(&self) -> Option<&T> {
        self.context.as_ref().and_then(|c| c.downcast_ref::<T>())
    }

    /// Results of the filters that ran so far (all of them, once published).
    pub fn results(&self) -> &Results {
        &self.results
    }

    /// Beginning signal of renderer `name`, present if it matched this action.
    pub fn render_beginning(&self, name: &str) -> Option<&Beginning> {
        self.beginnings.get(name)
    }

    /// Ending signal of renderer `name`, present if it matched this action.
    pub fn render_ending(&self, name: &str) -> Option<&Ending> {
        self.endings.get(name)
    }

    /// Names of the renderers this item was dispatched to.
    pub fn renderer_names(&self) -> impl Iterator<Item = &str> {
        self.beginnings.keys().map(|n| n.as_ref())
    }

    pub(crate) fn results_mut(&mut self) -> &mut Results {
        &mut self.results
    }

    /// Creates the lifecycle signals of a renderer and returns handles to them.
    pub(crate) fn attach_renderer(&mut self, name: &Arc<str>) -> (Beginning, Ending) {
        let begin: Beginning = Arc::new(Signal::new());
        let end: Ending = Arc::new(Signal::new());
        self.beginnings.insert(Arc::clone(name), Arc::clone(&begin));
        self.endings.insert(Arc::clone(name), Arc::clone(&end));
        (begin, end)
    }
}

impl fmt::Debug for StreamItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamItem")
            .field("seq", &self.seq)
            .field("action", &self.action)
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_insertion_order_and_identity() {
        let shared: Output = Arc::new(vec![1, 2, 3]);
        let mut results = Results::default();
        results.insert("b".into(), Arc::new(2_u32));
        results.insert("a".into(), Arc::clone(&shared));

        assert_eq!(results.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(results.get::<u32>("b"), Some(&2));
        assert_eq!(results.get::<String>("b"), None);
        assert!(Arc::ptr_eq(results.raw("a").unwrap(), &shared));
    }

    #[test]
    fn test_context_downcast() {
        let item = StreamItem::new(1, Action::new("any"), Some(Arc::new("ctx")));
        assert_eq!(item.context::<&str>(), Some(&"ctx"));
        assert_eq!(item.context::<u8>(), None);
    }

    #[test]
    fn test_attach_renderer_exposes_signals() {
        let mut item = StreamItem::new(1, Action::new("any"), None);
        let name: Arc<str> = "speaker".into();
        let (begin, _end) = item.attach_renderer(&name);

        let now = Instant::now();
        begin.fire(now);
        assert_eq!(item.render_beginning("speaker").unwrap().get(), Some(now));
        assert!(item.render_ending("other").is_none());
        assert_eq!(item.renderer_names().collect::<Vec<_>>(), vec!["speaker"]);
    }
}
