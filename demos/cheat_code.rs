//! # Cheat Code Example
//!
//! A renderer that only fires when a key is pressed five times within one
//! second, and at most once per 1.2s. Key presses are scripted: five slow
//! presses (no star), then five quick ones (a star).
//!
//! Diagnostic events are logged through `tracing` by the built-in `LogWriter`
//! (set `RUST_LOG=debug` to see the render lifecycle).
//!
//! ## Run
//! ```bash
//! cargo run --example cheat_code --features "logging"
//! ```

#[cfg(not(feature = "logging"))]
compile_error!("enable the `logging` feature");

use std::sync::Arc;
use std::time::Duration;

use actionvisor::{
    transforms, Action, Engine, EngineConfig, LogWriter, RenderFn, StreamItem, Subscribe,
    SubscriberConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let engine = Engine::builder(EngineConfig::default())
        .with_subscribers(subs)
        .build();

    engine.add_renderer(
        RenderFn::arc(|_: Arc<StreamItem>, _: CancellationToken| println!("  ✨🌟✨!")),
        SubscriberConfig::named("star")
            .with_actions_of_type("Key.pressed")
            .with_transform(transforms::chain(
                transforms::burst(5, Duration::from_secs(1)),
                transforms::throttle(Duration::from_millis(1200)),
            )),
    )?;

    println!("Press a key five times in a second to get a star");

    let slow = std::iter::repeat(Duration::from_millis(1000)).take(5);
    let quick = std::iter::once(Duration::from_secs(2))
        .chain(std::iter::repeat(Duration::from_millis(150)).take(4));

    let mut last = None;
    for gap in slow.chain(quick) {
        tokio::time::sleep(gap).await;
        println!("🕛 key");
        last = Some(engine.submit(Action::new("Key.pressed"))?);
    }

    if let Some(result) = last {
        let report = result.completed().await;
        println!("last press: {:?}", report.outcome("star"));
    }

    engine.shutdown().await?;
    Ok(())
}
