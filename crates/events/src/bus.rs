//! Per-run progress fan-out backed by `tokio::sync::broadcast`.
//!
//! [`ProgressBus`] maps run ids to broadcast topics. Subscribing lazily
//! creates the topic; publishing to a run with no topic (or no remaining
//! receivers) is a no-op. Topics with no receivers left are removed by the
//! publish that discovers them and swept on every subscribe, so the map
//! accumulates neither finished nor abandoned runs.

use std::collections::HashMap;

use tokio::sync::broadcast;
use lexiport_core::types::DbId;

use crate::progress::ProgressEvent;

/// Buffer capacity per run topic. Slow receivers past this lag observe
/// `RecvError::Lagged` rather than applying backpressure to the pipeline.
const TOPIC_CAPACITY: usize = 256;

/// In-process progress broadcaster, shared via `Arc<ProgressBus>`.
pub struct ProgressBus {
    topics: std::sync::RwLock<HashMap<DbId, broadcast::Sender<ProgressEvent>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            topics: std::sync::RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a run's progress stream, creating the topic if needed.
    ///
    /// Also sweeps topics whose last receiver has gone away, so runs that
    /// are subscribed to but never published to cannot accumulate dead
    /// senders in the map.
    pub fn subscribe(&self, run_id: DbId) -> broadcast::Receiver<ProgressEvent> {
        let mut topics = self.topics.write().expect("progress bus lock poisoned");
        topics.retain(|_, sender| sender.receiver_count() > 0);
        topics
            .entry(run_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to a run's observers. No-op without subscribers;
    /// the pipeline never blocks on the absence of a listener.
    pub fn publish(&self, run_id: DbId, event: ProgressEvent) {
        let stale = {
            let topics = self.topics.read().expect("progress bus lock poisoned");
            match topics.get(&run_id) {
                // Send fails only when every receiver is gone.
                Some(sender) => sender.send(event).is_err(),
                None => false,
            }
        };

        if stale {
            self.prune(run_id);
        }
    }

    /// Number of live observers for a run.
    pub fn observer_count(&self, run_id: DbId) -> usize {
        let topics = self.topics.read().expect("progress bus lock poisoned");
        topics
            .get(&run_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Drop a run's topic if it has no remaining receivers.
    fn prune(&self, run_id: DbId) {
        let mut topics = self.topics.write().expect("progress bus lock poisoned");
        if let Some(sender) = topics.get(&run_id) {
            if sender.receiver_count() == 0 {
                topics.remove(&run_id);
            }
        }
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::names;

    #[tokio::test]
    async fn publish_reaches_subscriber_of_same_run() {
        let bus = ProgressBus::new();
        let mut rx = bus.subscribe(1);

        bus.publish(
            1,
            ProgressEvent::new(names::CHUNK_START)
                .with_payload(serde_json::json!({"products": [10, 11]})),
        );

        let event = rx.recv().await.expect("should receive the event");
        assert_eq!(event.event, names::CHUNK_START);
        assert_eq!(event.payload["products"][0], 10);
    }

    #[tokio::test]
    async fn runs_are_isolated_topics() {
        let bus = ProgressBus::new();
        let mut rx_run1 = bus.subscribe(1);
        let mut rx_run2 = bus.subscribe(2);

        bus.publish(2, ProgressEvent::new(names::PRODUCT_START));

        let event = rx_run2.recv().await.expect("run 2 should receive");
        assert_eq!(event.event, names::PRODUCT_START);
        assert!(rx_run1.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = ProgressBus::new();
        bus.publish(99, ProgressEvent::new(names::TOTALS_UPDATE));
        assert_eq!(bus.observer_count(99), 0);
    }

    #[test]
    fn topic_is_pruned_after_last_receiver_drops() {
        let bus = ProgressBus::new();
        let rx = bus.subscribe(5);
        assert_eq!(bus.observer_count(5), 1);

        drop(rx);
        // First publish after the drop detects the dead topic and prunes it.
        bus.publish(5, ProgressEvent::new(names::PING));
        assert_eq!(bus.observer_count(5), 0);
        let topics = bus.topics.read().unwrap();
        assert!(!topics.contains_key(&5));
    }

    #[test]
    fn abandoned_topic_is_swept_on_next_subscribe() {
        let bus = ProgressBus::new();
        let rx = bus.subscribe(1);
        drop(rx);

        // A run that never publishes must not pin its dead topic forever;
        // any later subscription sweeps it.
        let _rx2 = bus.subscribe(2);
        let topics = bus.topics.read().unwrap();
        assert!(!topics.contains_key(&1));
        assert!(topics.contains_key(&2));
    }

    #[tokio::test]
    async fn multiple_observers_receive_same_event() {
        let bus = ProgressBus::new();
        let mut rx1 = bus.subscribe(3);
        let mut rx2 = bus.subscribe(3);

        bus.publish(3, ProgressEvent::new(names::PRODUCT_DONE));

        assert_eq!(rx1.recv().await.unwrap().event, names::PRODUCT_DONE);
        assert_eq!(rx2.recv().await.unwrap().event, names::PRODUCT_DONE);
    }
}
