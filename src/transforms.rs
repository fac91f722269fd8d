//! # Stream transforms for renderer pipelines.
//!
//! A [`StreamTransformer`] reshapes the stream of deliveries a renderer
//! receives, before its concurrency policy sees them. Deliveries a transform
//! drops settle as [`Outcome::Skipped`](crate::Outcome::Skipped).
//!
//! ```text
//! submit ─► [queue] ─► transform ─► Concurrency ─► renderer.render()
//! ```
//!
//! Transforms are instantiated once per renderer worker, so any state they
//! keep (windows, last-pass times) is private to that renderer.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use actionvisor::{transforms, SubscriberConfig};
//!
//! // Fire on the third key press within one second, at most every 5s.
//! let cfg = SubscriberConfig::named("cheat")
//!     .with_actions_of_type("Key.pressed")
//!     .with_transform(transforms::chain(
//!         transforms::burst(3, Duration::from_secs(1)),
//!         transforms::throttle(Duration::from_secs(5)),
//!     ));
//! ```

use std::collections::VecDeque;
use std::future::ready;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;

use crate::controller::{DeliveryStream, StreamTransformer};

/// Passes a delivery only when it completes a run of `count` deliveries
/// received within `within`. The run then starts over.
///
/// `count` of 0 or 1 passes everything.
pub fn burst(count: usize, within: Duration) -> StreamTransformer {
    Arc::new(move |input: DeliveryStream| {
        let mut window: VecDeque<Instant> = VecDeque::with_capacity(count);
        input
            .filter_map(move |delivery| {
                let now = Instant::now();
                while window
                    .front()
                    .is_some_and(|first| now.duration_since(*first) > within)
                {
                    window.pop_front();
                }
                window.push_back(now);

                let pass = window.len() >= count;
                if pass {
                    window.clear();
                }
                ready(pass.then_some(delivery))
            })
            .boxed()
    })
}

/// Passes at most one delivery per `period`; the first always passes.
pub fn throttle(period: Duration) -> StreamTransformer {
    Arc::new(move |input: DeliveryStream| {
        let mut last: Option<Instant> = None;
        input
            .filter_map(move |delivery| {
                let now = Instant::now();
                let pass = last.map_or(true, |at| now.duration_since(at) >= period);
                if pass {
                    last = Some(now);
                }
                ready(pass.then_some(delivery))
            })
            .boxed()
    })
}

/// Applies `first`, then `second`.
pub fn chain(first: StreamTransformer, second: StreamTransformer) -> StreamTransformer {
    Arc::new(move |input: DeliveryStream| second(first(input)))
}
