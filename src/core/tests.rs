use std::future::ready;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::{
    Action, Concurrency, ConfigError, DeliveryStream, DispatchError, Engine, EngineConfig, Event,
    EventKind, FilterFn, Outcome, Render, RenderFn, RendererRef, StreamItem, StreamTransformer,
    Subscribe, SubscriberConfig,
};

#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    fn push(&self, line: impl Into<String>) {
        self.0.lock().unwrap().push(line.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Renderer that logs `start N` / `end N` around a sleep and returns the seq.
fn sleeper(log: &Log, ms: u64) -> RendererRef {
    let log = log.clone();
    RenderFn::arc(move |item: Arc<StreamItem>, _ctx: CancellationToken| {
        let log = log.clone();
        let seq = item.seq();
        Render::task(async move {
            log.push(format!("start {seq}"));
            tokio::time::sleep(Duration::from_millis(ms)).await;
            log.push(format!("end {seq}"));
            Ok(seq)
        })
    })
}

fn counting_filter(counter: &Arc<AtomicUsize>) -> crate::FilterRef {
    let counter = Arc::clone(counter);
    FilterFn::arc(move |_: &StreamItem| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[tokio::test]
async fn test_submit_without_subscribers_returns_the_action() {
    let engine = Engine::new();
    let action = Action::new("Ping")
        .with_payload(json!({ "n": 1 }))
        .with_meta("source", "test");

    let result = engine.submit(action.clone()).unwrap();

    assert_eq!(result.action(), &action);
    assert_eq!(result.kind(), "Ping");
    assert_eq!(result.payload(), Some(&json!({ "n": 1 })));
    assert!(result.results().is_empty());
    assert!(result.completed().is_settled());
    assert!(result.completed().await.is_empty());
}

#[tokio::test]
async fn test_missing_type_is_rejected() {
    let engine = Engine::new();
    let err = engine.submit(Action::new("")).unwrap_err();
    assert_eq!(err.as_label(), "dispatch_missing_type");
}

#[tokio::test]
async fn test_filters_run_in_order_and_see_earlier_results() {
    let engine = Engine::new();
    let order = Log::default();

    for name in ["a", "b", "c"] {
        let order = order.clone();
        let filter = FilterFn::arc(move |item: &StreamItem| {
            order.push(name);
            Ok(item.results().len())
        });
        engine.add_filter(filter, SubscriberConfig::named(name)).unwrap();
    }

    let result = engine.submit(Action::new("Any")).unwrap();

    assert_eq!(order.take(), ["a", "b", "c"]);
    assert_eq!(result.results().names().collect::<Vec<_>>(), ["a", "b", "c"]);
    assert_eq!(result.get::<usize>("a"), Some(&0));
    assert_eq!(result.get::<usize>("b"), Some(&1));
    assert_eq!(result.get::<usize>("c"), Some(&2));
    assert_eq!(result.get::<String>("a"), None);
}

#[tokio::test]
async fn test_failing_filter_stops_the_pipeline() {
    let engine = Engine::new();
    let later = Arc::new(AtomicUsize::new(0));
    let mut tap = engine.action_stream().subscribe();

    engine
        .add_filter(FilterFn::arc(|_: &StreamItem| Ok(1u8)), SubscriberConfig::named("a"))
        .unwrap();
    engine
        .add_filter(
            FilterFn::arc(|_: &StreamItem| -> anyhow::Result<u8> { anyhow::bail!("boom") }),
            SubscriberConfig::named("b"),
        )
        .unwrap();
    engine
        .add_filter(counting_filter(&later), SubscriberConfig::named("c"))
        .unwrap();

    let err = engine.submit(Action::new("Any")).unwrap_err();

    match &err {
        DispatchError::FilterFailed { filter, error } => {
            assert_eq!(filter, "b");
            assert!(error.contains("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert!(tap.try_recv().is_err());
    assert_eq!(engine.filter_names(), ["a", "b", "c"]);
}

#[tokio::test]
async fn test_filter_failure_does_not_reach_renderers() {
    let engine = Engine::new();
    let log = Log::default();
    engine
        .add_renderer(sleeper(&log, 1), SubscriberConfig::named("r"))
        .unwrap();
    engine
        .add_filter(
            FilterFn::arc(|item: &StreamItem| -> anyhow::Result<()> {
                anyhow::ensure!(item.action().kind != "Bad", "bad action");
                Ok(())
            }),
            SubscriberConfig::named("guard"),
        )
        .unwrap();

    assert!(engine.submit(Action::new("Bad")).is_err());
    let report = engine.submit(Action::new("Good")).unwrap().completed().await;

    assert_eq!(report.outcome("r"), Some(&Outcome::Completed));
    assert_eq!(log.take(), ["start 2", "end 2"]);
}

#[tokio::test(start_paused = true)]
async fn test_parallel_invocations_overlap() {
    let engine = Engine::new();
    let log = Log::default();
    engine
        .add_renderer(sleeper(&log, 100), SubscriberConfig::named("r"))
        .unwrap();

    let a = engine.submit(Action::new("Go")).unwrap();
    let b = engine.submit(Action::new("Go")).unwrap();
    let ra = a.completed().await;
    let rb = b.completed().await;

    assert_eq!(ra.outcome("r"), Some(&Outcome::Completed));
    assert_eq!(rb.outcome("r"), Some(&Outcome::Completed));

    let lines = log.take();
    assert_eq!(lines.len(), 4);
    assert!(lines[..2].iter().all(|l| l.starts_with("start")), "{lines:?}");
}

#[tokio::test(start_paused = true)]
async fn test_serial_invocations_run_in_order() {
    let engine = Engine::new();
    let log = Log::default();
    engine
        .add_renderer(
            sleeper(&log, 100),
            SubscriberConfig::named("r").with_concurrency(Concurrency::Serial),
        )
        .unwrap();

    let a = engine.submit(Action::new("Go")).unwrap();
    let b = engine.submit(Action::new("Go")).unwrap();
    let rb = b.completed().await;
    let ra = a.completed().await;

    assert_eq!(log.take(), ["start 1", "end 1", "start 2", "end 2"]);
    assert_eq!(ra.outcome("r"), Some(&Outcome::Completed));
    assert_eq!(rb.outcome("r"), Some(&Outcome::Completed));
}

#[tokio::test(start_paused = true)]
async fn test_cutoff_cancels_the_running_invocation() {
    let engine = Engine::new();
    let log = Log::default();
    engine
        .add_renderer(
            sleeper(&log, 100),
            SubscriberConfig::named("r").with_concurrency(Concurrency::Cutoff),
        )
        .unwrap();

    let a = engine.submit(Action::new("Go")).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let b = engine.submit(Action::new("Go")).unwrap();

    let ra = a.completed().await;
    let rb = b.completed().await;

    assert_eq!(ra.outcome("r"), Some(&Outcome::Cancelled));
    assert_eq!(rb.outcome("r"), Some(&Outcome::Completed));
    assert_eq!(log.take(), ["start 1", "start 2", "end 2"]);

    let ending = a.item().render_ending("r").unwrap();
    assert_eq!(ending.get(), Some(Outcome::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_cutoff_supersedes_pending_requests() {
    let engine = Engine::new();
    let log = Log::default();
    engine
        .add_renderer(
            sleeper(&log, 100),
            SubscriberConfig::named("r").with_concurrency(Concurrency::Cutoff),
        )
        .unwrap();

    let a = engine.submit(Action::new("Go")).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let b = engine.submit(Action::new("Go")).unwrap();
    let c = engine.submit(Action::new("Go")).unwrap();

    assert_eq!(a.completed().await.outcome("r"), Some(&Outcome::Cancelled));
    assert_eq!(b.completed().await.outcome("r"), Some(&Outcome::Superseded));
    assert_eq!(c.completed().await.outcome("r"), Some(&Outcome::Completed));
    assert!(!log.take().contains(&"start 2".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_mute_drops_actions_while_busy() {
    let engine = Engine::new();
    let log = Log::default();
    engine
        .add_renderer(
            sleeper(&log, 100),
            SubscriberConfig::named("r").with_concurrency(Concurrency::Mute),
        )
        .unwrap();

    let a = engine.submit(Action::new("Go")).unwrap();
    let b = engine.submit(Action::new("Go")).unwrap();

    let rb = b.completed().await;
    assert_eq!(rb.outcome("r"), Some(&Outcome::Muted));
    assert_eq!(b.item().render_ending("r").unwrap().wait().await, None);

    let ra = a.completed().await;
    assert_eq!(ra.outcome("r"), Some(&Outcome::Completed));
    assert_eq!(log.take(), ["start 1", "end 1"]);

    // Idle again: the next action runs.
    let c = engine.submit(Action::new("Go")).unwrap();
    assert_eq!(c.completed().await.outcome("r"), Some(&Outcome::Completed));
}

#[tokio::test]
async fn test_renderer_failures_never_reject() {
    let engine = Engine::new();
    engine
        .add_renderer(
            RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| {
                Render::task(async { Err::<(), _>(anyhow::anyhow!("tts offline")) })
            }),
            SubscriberConfig::named("failing"),
        )
        .unwrap();
    engine
        .add_renderer(
            RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| -> Render {
                panic!("renderer bug")
            }),
            SubscriberConfig::named("panicking"),
        )
        .unwrap();

    let result = engine.submit(Action::new("Speak")).unwrap();
    let report = result.completed().await;

    match report.outcome("failing") {
        Some(Outcome::Failed { reason }) => assert!(reason.contains("tts offline")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(matches!(report.outcome("panicking"), Some(Outcome::Failed { .. })));
    assert_eq!(report.failures().count(), 2);

    // The engine keeps working.
    assert!(engine.submit(Action::new("Speak")).is_ok());
}

#[tokio::test]
async fn test_invalid_names_register_nothing() {
    let engine = Engine::new();
    let noop = || RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| ());

    let err = engine
        .add_renderer(noop(), SubscriberConfig::named("completed"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::ReservedName { .. }));

    engine.add_renderer(noop(), SubscriberConfig::named("r")).unwrap();
    let err = engine
        .add_renderer(noop(), SubscriberConfig::named("r"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateName { .. }));

    assert_eq!(engine.renderer_names(), ["r"]);
    let report = engine.submit(Action::new("Any")).unwrap().completed().await;
    assert_eq!(report.settlements().len(), 1);
}

#[tokio::test]
async fn test_unsubscribed_handlers_see_no_later_actions() {
    let engine = Engine::new();
    let filtered = Arc::new(AtomicUsize::new(0));
    let filter = engine
        .add_filter(counting_filter(&filtered), SubscriberConfig::default())
        .unwrap();
    let renderer = engine
        .add_renderer(
            RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| ()),
            SubscriberConfig::default(),
        )
        .unwrap();

    let first = engine.submit(Action::new("Any")).unwrap();
    assert_eq!(first.completed().await.outcome("renderer_1"), Some(&Outcome::Completed));

    assert!(filter.unsubscribe());
    assert!(renderer.unsubscribe());

    let second = engine.submit(Action::new("Any")).unwrap();
    assert!(second.completed().await.is_empty());
    assert!(second.results().is_empty());
    assert_eq!(filtered.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_keeps_already_delivered_actions() {
    let engine = Engine::new();
    let log = Log::default();
    let renderer = engine
        .add_renderer(
            sleeper(&log, 100),
            SubscriberConfig::named("r").with_concurrency(Concurrency::Serial),
        )
        .unwrap();

    let a = engine.submit(Action::new("Go")).unwrap();
    let b = engine.submit(Action::new("Go")).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(renderer.unsubscribe());
    let c = engine.submit(Action::new("Go")).unwrap();

    assert_eq!(a.completed().await.outcome("r"), Some(&Outcome::Completed));
    assert_eq!(b.completed().await.outcome("r"), Some(&Outcome::Completed));
    assert!(c.completed().await.is_empty());
    assert_eq!(log.take(), ["start 1", "end 1", "start 2", "end 2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_submissions_from_many_threads_reach_renderers_in_order() {
    let engine = Engine::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    engine
        .add_renderer(
            RenderFn::arc(move |item: Arc<StreamItem>, _: CancellationToken| {
                sink.lock().unwrap().push(item.seq());
            }),
            SubscriberConfig::named("r").with_concurrency(Concurrency::Serial),
        )
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            let mut results = Vec::new();
            for _ in 0..200 {
                results.push(engine.submit(Action::new("Go")).unwrap());
                tokio::task::yield_now().await;
            }
            results
        }));
    }

    for task in tasks {
        for result in task.await.unwrap() {
            assert_eq!(result.completed().await.outcome("r"), Some(&Outcome::Completed));
        }
    }

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, (1..=1600).collect::<Vec<u64>>());
}

#[test]
fn test_add_renderer_outside_runtime_is_rejected() {
    let engine = Engine::new();
    let err = engine
        .add_renderer(
            RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| ()),
            SubscriberConfig::named("r"),
        )
        .unwrap_err();

    assert_eq!(err, ConfigError::NoRuntime);
    assert!(engine.renderer_names().is_empty());
}

#[tokio::test]
async fn test_engine_id_comes_from_config() {
    let engine = Engine::builder(EngineConfig {
        id: Some("a4ad3d".into()),
        ..EngineConfig::default()
    })
    .build();

    assert_eq!(engine.id(), Some("a4ad3d"));
    assert_eq!(Engine::new().id(), None);
}

#[tokio::test]
async fn test_context_is_visible_to_handlers() {
    let engine = Engine::new();
    engine
        .add_filter(
            FilterFn::arc(|item: &StreamItem| Ok(item.context::<u32>().copied())),
            SubscriberConfig::named("ctx"),
        )
        .unwrap();

    let with = engine.submit_with_context(Action::new("Any"), 7u32).unwrap();
    let without = engine.submit(Action::new("Any")).unwrap();

    assert_eq!(with.get::<Option<u32>>("ctx"), Some(&Some(7)));
    assert_eq!(without.get::<Option<u32>>("ctx"), Some(&None));
}

#[tokio::test]
async fn test_filter_may_submit_reentrantly() {
    let engine = Engine::new();
    let nested = engine.clone();
    engine
        .add_filter(
            FilterFn::arc(move |item: &StreamItem| {
                if item.action().kind == "Outer" {
                    nested.submit(Action::new("Inner"))?;
                }
                Ok(())
            }),
            SubscriberConfig::named("relay"),
        )
        .unwrap();

    let mut tap = engine.action_stream().subscribe();
    let outer = engine.submit(Action::new("Outer")).unwrap();

    assert_eq!(tap.try_recv().unwrap().action().kind, "Inner");
    let published = tap.try_recv().unwrap();
    assert_eq!(published.action().kind, "Outer");
    assert!(Arc::ptr_eq(&published, outer.item()));
}

#[tokio::test]
async fn test_actions_of_type_limits_deliveries() {
    let engine = Engine::new();
    let log = Log::default();
    engine
        .add_renderer(
            sleeper(&log, 1),
            SubscriberConfig::named("speaker").with_actions_of_type("Speak"),
        )
        .unwrap();
    engine
        .add_renderer(
            sleeper(&log, 1),
            SubscriberConfig::named("files")
                .with_actions_of_type(regex::Regex::new(r"^File\.").unwrap()),
        )
        .unwrap();

    let speak = engine.submit(Action::new("Speak")).unwrap();
    let append = engine.submit(Action::new("File.append")).unwrap();
    let other = engine.submit(Action::new("Other")).unwrap();

    let speak = speak.completed().await;
    assert_eq!(speak.settlements().len(), 1);
    assert_eq!(speak.outcome("speaker"), Some(&Outcome::Completed));

    let append = append.completed().await;
    assert_eq!(append.settlements().len(), 1);
    assert_eq!(append.outcome("files"), Some(&Outcome::Completed));

    assert!(other.completed().await.is_empty());
    assert!(other.item().render_beginning("speaker").is_none());
}

#[tokio::test]
async fn test_transform_drops_settle_as_skipped() {
    let engine = Engine::new();
    let even_only: StreamTransformer =
        Arc::new(|input: DeliveryStream| input.filter(|d| ready(d.seq() % 2 == 0)).boxed());
    engine
        .add_renderer(
            RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| ()),
            SubscriberConfig::named("r").with_transform(even_only),
        )
        .unwrap();

    let odd = engine.submit(Action::new("Any")).unwrap();
    let even = engine.submit(Action::new("Any")).unwrap();

    assert_eq!(odd.completed().await.outcome("r"), Some(&Outcome::Skipped));
    assert_eq!(even.completed().await.outcome("r"), Some(&Outcome::Completed));
    assert_eq!(odd.item().render_beginning("r").unwrap().wait().await, None);
}

#[tokio::test]
async fn test_process_results_exposes_outputs() {
    let engine = Engine::new();
    let log = Log::default();
    engine
        .add_renderer(
            sleeper(&log, 1),
            SubscriberConfig::named("kept").with_process_results(true),
        )
        .unwrap();
    engine
        .add_renderer(sleeper(&log, 1), SubscriberConfig::named("discarded"))
        .unwrap();
    engine
        .add_renderer(
            RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| {
                Render::steps(futures::stream::iter([Ok(1u8), Ok(2), Ok(3)]))
            }),
            SubscriberConfig::named("steps").with_process_results(true),
        )
        .unwrap();

    let result = engine.submit(Action::new("Any")).unwrap();
    assert_eq!(result.get::<u64>("kept"), None);
    let report = result.completed().await;

    assert_eq!(report.output::<u64>("kept"), Some(&1));
    assert_eq!(report.output::<u64>("discarded"), None);
    assert_eq!(report.output::<u8>("steps"), Some(&3));
}

#[tokio::test]
async fn test_render_signals_fire_around_the_invocation() {
    let engine = Engine::new();
    engine
        .add_renderer(
            RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| Render::value("done")),
            SubscriberConfig::named("r"),
        )
        .unwrap();

    let result = engine.submit(Action::new("Any")).unwrap();
    let item = Arc::clone(result.item());
    assert_eq!(item.renderer_names().collect::<Vec<_>>(), ["r"]);

    let began = item.render_beginning("r").unwrap().wait().await;
    let ended = item.render_ending("r").unwrap().wait().await;
    assert!(began.is_some());
    assert_eq!(ended, Some(Outcome::Completed));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_and_skips() {
    let engine = Engine::builder(EngineConfig {
        grace: Duration::from_secs(1),
        ..EngineConfig::default()
    })
    .build();
    let log = Log::default();
    engine
        .add_renderer(
            sleeper(&log, 60_000),
            SubscriberConfig::named("r").with_concurrency(Concurrency::Serial),
        )
        .unwrap();
    let mut events = engine.events();

    let a = engine.submit(Action::new("Go")).unwrap();
    let b = engine.submit(Action::new("Go")).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    engine.shutdown().await.unwrap();

    assert_eq!(a.completed().await.outcome("r"), Some(&Outcome::Cancelled));
    assert_eq!(b.completed().await.outcome("r"), Some(&Outcome::Skipped));
    assert!(engine.renderer_names().is_empty());

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::ShutdownRequested));
    assert!(kinds.contains(&EventKind::AllStoppedWithin));
}

struct Collector(Arc<Mutex<Vec<EventKind>>>);

#[async_trait]
impl Subscribe for Collector {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_receive_events() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let collector: Arc<dyn Subscribe> = Arc::new(Collector(Arc::clone(&seen)));
    let engine = Engine::builder(EngineConfig::default())
        .with_subscribers(vec![collector])
        .build();

    engine
        .add_renderer(
            RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| ()),
            SubscriberConfig::named("r"),
        )
        .unwrap();
    engine.submit(Action::new("Any")).unwrap().completed().await;
    engine.shutdown().await.unwrap();

    for _ in 0..100 {
        if seen.lock().unwrap().contains(&EventKind::AllStoppedWithin) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let seen = seen.lock().unwrap().clone();
    for kind in [
        EventKind::RendererAdded,
        EventKind::ActionSubmitted,
        EventKind::RenderStarting,
        EventKind::RenderCompleted,
        EventKind::ActionSettled,
        EventKind::AllStoppedWithin,
    ] {
        assert!(seen.contains(&kind), "missing {kind:?} in {seen:?}");
    }
}
