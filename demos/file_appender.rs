//! # File Appender Example
//!
//! Actions of type `File.append` carry `{ fileName, content }`. A filter
//! validates the payload synchronously (a bad action is rejected by `submit`),
//! and a serial renderer appends the content, so writes to the file never
//! interleave and land in submission order.
//!
//! ## Run
//! ```bash
//! cargo run --example file_appender
//! ```

use std::sync::Arc;

use actionvisor::{
    Action, Concurrency, Engine, FilterFn, Render, RenderFn, StreamItem, SubscriberConfig,
};
use anyhow::Context as _;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
struct Append {
    path: std::path::PathBuf,
    content: String,
}

fn parse(item: &StreamItem) -> anyhow::Result<Append> {
    let payload = item.action().payload.as_ref().context("missing payload")?;
    let file = payload["fileName"].as_str().context("missing fileName")?;
    let content = payload["content"].as_str().context("missing content")?;
    Ok(Append {
        path: std::env::temp_dir().join(file),
        content: content.to_owned(),
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let engine = Engine::new();

    engine.add_filter(
        FilterFn::arc(|item: &StreamItem| {
            if item.action().kind == "File.append" {
                parse(item).map(Some)
            } else {
                Ok(None)
            }
        }),
        SubscriberConfig::named("append"),
    )?;

    engine.add_renderer(
        RenderFn::arc(|item: Arc<StreamItem>, _ctx: CancellationToken| {
            let append = item.results().get::<Option<Append>>("append").cloned().flatten();
            Render::task(async move {
                let Some(Append { path, content }) = append else {
                    return Ok::<_, anyhow::Error>(0);
                };
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await
                    .with_context(|| format!("open {}", path.display()))?;
                file.write_all(content.as_bytes()).await?;
                Ok(content.len())
            })
        }),
        SubscriberConfig::named("writer")
            .with_actions_of_type("File.append")
            .with_concurrency(Concurrency::Serial)
            .with_process_results(true),
    )?;

    let lines = ["first line\n", "second line\n", "third line\n"];
    let mut pending = Vec::new();
    for line in lines {
        let action = Action::new("File.append")
            .with_payload(json!({ "fileName": "actionvisor-demo.log", "content": line }));
        pending.push(engine.submit(action)?);
    }

    match engine.submit(Action::new("File.append").with_payload(json!({ "content": "x" }))) {
        Ok(_) => println!("unexpected: invalid append accepted"),
        Err(err) => println!("rejected: {err}"),
    }

    for result in pending {
        let report = result.completed().await;
        println!(
            "#{} wrote {:?} bytes",
            result.item().seq(),
            report.output::<usize>("writer")
        );
    }

    let path = std::env::temp_dir().join("actionvisor-demo.log");
    println!("{}", tokio::fs::read_to_string(&path).await?);

    engine.shutdown().await?;
    Ok(())
}
