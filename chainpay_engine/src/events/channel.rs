//! Simple stateless pub-sub event plumbing.
//!
//! Components of the gateway can subscribe to reconciliation events and react to them (notify a merchant backend,
//! kick a fulfilment job, and so on). Handlers are stateless: all they receive is the event itself, and each event
//! is dispatched on its own task so a slow handler never blocks the reconciliation flow.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::sync::mpsc;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Owns the receiving side of an event channel and the handler closure that consumes events.
pub struct EventHandler<E: Send + Sync + 'static> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs the dispatch loop until every producer has been dropped.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // Drop the internal sender so that the loop ends once the last subscriber is gone.
        drop(self.sender);
        while let Some(event) = self.receiver.recv().await {
            trace!("📬️ Dispatching event");
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                (handler)(event).await;
            });
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[tokio::test]
    async fn events_reach_the_handler() {
        let _ = env_logger::try_init();
        let total = Arc::new(AtomicU64::new(0));
        let tally = Arc::clone(&total);
        let handler = Arc::new(move |v: u64| {
            let tally = Arc::clone(&tally);
            Box::pin(async move {
                tally.fetch_add(v, Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(4, handler);
        let producer = event_handler.subscribe();
        tokio::spawn(async move {
            for v in 1..=10u64 {
                producer.publish_event(v).await;
            }
        });
        event_handler.start_handler().await;
        // start_handler returns when all producers are dropped; give spawned dispatches a beat to land
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert_eq!(total.load(Ordering::SeqCst), 55);
    }
}
