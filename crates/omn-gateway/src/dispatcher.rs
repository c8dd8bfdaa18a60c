use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast;
use tracing::debug;

use omn_types::events::GatewayEvent;

/// Fans change events out to every connected client. Each connection filters
/// what it forwards by feed and audience.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Identified connections currently open.
    connections: AtomicUsize,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: AtomicUsize::new(0),
            }),
        }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event. Having no listeners is not an error.
    pub fn broadcast(&self, event: GatewayEvent) {
        if self.inner.broadcast_tx.send(event).is_err() {
            debug!("No gateway listeners");
        }
    }

    pub(crate) fn connection_opened(&self) -> usize {
        self.inner.connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn connection_closed(&self) -> usize {
        self.inner.connections.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.load(Ordering::Relaxed)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_broadcasts() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.broadcast(GatewayEvent::PollsChanged);

        match rx.recv().await.unwrap() {
            GatewayEvent::PollsChanged => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn broadcast_without_listeners_is_fine() {
        let dispatcher = Dispatcher::new();
        dispatcher.broadcast(GatewayEvent::EventsChanged);
        assert_eq!(dispatcher.connection_count(), 0);
    }
}
