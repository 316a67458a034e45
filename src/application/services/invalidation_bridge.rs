//! Turns realtime pushes and mutations into cache invalidations.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::query_cache::QueryCache;
use crate::domain::entities::{InvalidationEvent, Topic};
use crate::domain::ports::RealtimeEvent;

/// Topics a change to `topic` makes stale.
#[must_use]
pub fn dependent_topics(topic: &Topic) -> Vec<Topic> {
    if *topic == Topic::STOCK {
        Topic::stock_movement()
    } else {
        vec![topic.clone()]
    }
}

/// Topics to invalidate for one realtime event. Connection lifecycle events
/// invalidate nothing.
#[must_use]
pub fn topics_for_event(event: &RealtimeEvent) -> Vec<Topic> {
    match event {
        RealtimeEvent::Message(message) => message
            .topic
            .as_ref()
            .map_or_else(Topic::stock_movement, dependent_topics),
        RealtimeEvent::Connected
        | RealtimeEvent::Disconnected { .. }
        | RealtimeEvent::Reconnecting { .. }
        | RealtimeEvent::GaveUp { .. } => Vec::new(),
    }
}

/// Applies one realtime event to the cache. Returns the topics invalidated.
pub fn handle_realtime_event(cache: &QueryCache, event: &RealtimeEvent) -> Vec<Topic> {
    let topics = topics_for_event(event);
    for topic in &topics {
        cache.invalidate_topic(topic);
    }
    topics
}

/// Wires realtime and mutation events into a [`QueryCache`].
pub struct CacheInvalidationBridge {
    cache: Arc<QueryCache>,
    notify: broadcast::Sender<InvalidationEvent>,
}

impl CacheInvalidationBridge {
    #[must_use]
    pub fn new(cache: Arc<QueryCache>) -> Self {
        let (notify, _) = broadcast::channel(64);
        Self { cache, notify }
    }

    /// Topics invalidated by the bridge, for display or logging.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.notify.subscribe()
    }

    /// Consumes both event streams until both are closed.
    pub fn spawn(
        self,
        mut realtime: broadcast::Receiver<RealtimeEvent>,
        mut mutations: broadcast::Receiver<InvalidationEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut realtime_open = true;
            let mut mutations_open = true;

            while realtime_open || mutations_open {
                tokio::select! {
                    event = realtime.recv(), if realtime_open => match event {
                        Ok(event) => {
                            for topic in handle_realtime_event(&self.cache, &event) {
                                self.announce(topic);
                            }
                        }
                        Err(e) => realtime_open = self.handle_recv_error(e, "realtime"),
                    },
                    event = mutations.recv(), if mutations_open => match event {
                        Ok(event) => {
                            self.cache.invalidate_topic(&event.topic);
                            self.announce(event.topic);
                        }
                        Err(e) => mutations_open = self.handle_recv_error(e, "mutations"),
                    },
                }
            }

            info!("Cache invalidation bridge stopped");
        })
    }

    fn announce(&self, topic: Topic) {
        let _ = self.notify.send(InvalidationEvent::new(topic));
    }

    /// Returns whether the source stays open.
    fn handle_recv_error(&self, error: RecvError, source: &'static str) -> bool {
        match error {
            RecvError::Lagged(skipped) => {
                warn!(source, skipped, "Invalidation events lost, invalidating everything");
                self.cache.invalidate_all();
                true
            }
            RecvError::Closed => {
                debug!(source, "Invalidation source closed");
                false
            }
        }
    }
}
