//! # Concurrency Modes Example
//!
//! Submits the same burst of three actions to four renderers, one per policy:
//! - Parallel: every action renders, overlapping
//! - Serial: actions render one after another
//! - Cutoff: each new action cancels the running one; only the last completes
//! - Mute: actions arriving while busy are dropped
//!
//! ## Run
//! ```bash
//! cargo run --example concurrency_modes
//! ```

use std::sync::Arc;
use std::time::Duration;

use actionvisor::{
    Action, Concurrency, Engine, Render, RenderFn, RendererRef, StreamItem, SubscriberConfig,
};
use tokio_util::sync::CancellationToken;

fn make_renderer(label: &'static str, duration_ms: u64) -> RendererRef {
    RenderFn::arc(move |item: Arc<StreamItem>, _ctx: CancellationToken| {
        let seq = item.seq();
        Render::task(async move {
            println!("{:>6}[{label}] #{seq} started", "");
            let start = tokio::time::Instant::now();
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
            println!("{:>6}[{label}] #{seq} completed in {:?}", "", start.elapsed());
            Ok(())
        })
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let engine = Engine::new();

    for mode in [
        Concurrency::Parallel,
        Concurrency::Serial,
        Concurrency::Cutoff,
        Concurrency::Mute,
    ] {
        engine.add_renderer(
            make_renderer(mode.as_label(), 300),
            SubscriberConfig::named(mode.as_label()).with_concurrency(mode),
        )?;
    }

    let mut pending = Vec::new();
    for _ in 0..3 {
        pending.push(engine.submit(Action::new("Tick"))?);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    for result in pending {
        let report = result.completed().await;
        let line: Vec<String> = report
            .settlements()
            .iter()
            .map(|s| format!("{}={}", s.renderer, s.outcome.as_label()))
            .collect();
        println!("action #{}: {}", result.item().seq(), line.join(" "));
    }

    engine.shutdown().await?;
    Ok(())
}
