use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::BoxStream;

use crate::completion::Ticket;
use crate::item::StreamItem;

/// One stream item handed to one renderer's pipeline.
///
/// Carries the renderer's completion ticket: the renderer's share of the
/// action's completion settles when the last clone of the delivery is
/// dropped. A transform that filters a delivery out therefore settles it as
/// [`Outcome::Skipped`](crate::Outcome::Skipped).
#[derive(Clone)]
pub struct Delivery {
    item: Arc<StreamItem>,
    ticket: Arc<Ticket>,
    received_at: Instant,
}

impl Delivery {
    pub(crate) fn new(item: Arc<StreamItem>, ticket: Ticket) -> Self {
        Self {
            item,
            ticket: Arc::new(ticket),
            received_at: Instant::now(),
        }
    }

    pub fn item(&self) -> &Arc<StreamItem> {
        &self.item
    }

    /// When the item was handed to this renderer.
    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    pub(crate) fn ticket(&self) -> &Ticket {
        &self.ticket
    }
}

impl Deref for Delivery {
    type Target = StreamItem;

    fn deref(&self) -> &StreamItem {
        &self.item
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("seq", &self.item.seq())
            .field("action", &self.item.action().kind)
            .finish()
    }
}

/// A renderer's input stream.
pub type DeliveryStream = BoxStream<'static, Delivery>;

/// Stream-to-stream function applied before a renderer's concurrency controller.
pub type StreamTransformer = Arc<dyn Fn(DeliveryStream) -> DeliveryStream + Send + Sync>;
