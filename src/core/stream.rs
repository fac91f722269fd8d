//! # Action stream tap.
//!
//! Every action that passes the filter pipeline is published here, fully
//! populated, before any renderer sees it. Renderer pipelines do not read
//! from this channel (each worker has its own unbounded queue); the tap is
//! for external observers.
//!
//! A receiver that falls more than `stream_capacity` items behind observes
//! `Lagged` and skips ahead; [`ActionStream::stream`] skips silently.

use std::sync::Arc;

use futures::{future, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::item::StreamItem;

/// Read-only tap on the engine's stream of published items.
#[derive(Clone)]
pub struct ActionStream {
    tx: broadcast::Sender<Arc<StreamItem>>,
}

impl ActionStream {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn publish(&self, item: Arc<StreamItem>) {
        let _ = self.tx.send(item);
    }

    /// Raw receiver; reports `Lagged(n)` when it falls behind.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StreamItem>> {
        self.tx.subscribe()
    }

    /// Items published from now on, as a stream. Lagged items are skipped.
    pub fn stream(&self) -> impl Stream<Item = Arc<StreamItem>> + Send + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|r| future::ready(r.ok()))
    }

    /// Number of attached receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl std::fmt::Debug for ActionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionStream")
            .field("receivers", &self.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    #[tokio::test]
    async fn test_lagging_stream_skips_ahead() {
        let tap = ActionStream::new(2);
        let mut stream = Box::pin(tap.stream());

        for seq in 1..=5 {
            tap.publish(Arc::new(StreamItem::new(seq, Action::new("tick"), None)));
        }

        let first = stream.next().await.unwrap();
        assert_eq!(first.seq(), 4);
        assert_eq!(stream.next().await.unwrap().seq(), 5);
    }

    #[test]
    fn test_publish_without_receivers_is_fine() {
        let tap = ActionStream::new(0);
        tap.publish(Arc::new(StreamItem::new(1, Action::new("x"), None)));
        assert_eq!(tap.receiver_count(), 0);
    }
}
