use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use karantene_types::events::GatewayEvent;

/// Minimum gap between accepted cheers from one identity.
pub const CHEER_WINDOW: Duration = Duration::from_secs(60);

/// Manages all connected clients and broadcasts events.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel; all connected clients receive all events
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Per-connection targeted send channels, for notices that must
    /// reach only the originating socket
    connections: RwLock<HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>,

    /// Last accepted cheer per identity. Keyed by name, not by
    /// connection: two tabs of the same user share one slot.
    last_cheer: Mutex<HashMap<String, Instant>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
                last_cheer: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to broadcast events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients. Best-effort: a
    /// send with no receivers is not an error.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a connection for targeted sends. Returns its id and
    /// the receiving end.
    pub async fn register_connection(&self) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.connections.write().await.insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Prune a disconnected client from the fan-out set.
    pub async fn unregister_connection(&self, conn_id: Uuid) {
        self.inner.connections.write().await.remove(&conn_id);
    }

    /// Send a targeted event to a single connection.
    pub async fn send_to_connection(&self, conn_id: Uuid, event: GatewayEvent) {
        let connections = self.inner.connections.read().await;
        if let Some(tx) = connections.get(&conn_id) {
            let _ = tx.send(event);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }

    /// Check and claim the cheer slot for an identity. Accepting
    /// updates the slot; a rejected cheer leaves it untouched.
    pub fn try_cheer(&self, navn: &str) -> bool {
        self.try_cheer_at(navn, Instant::now())
    }

    fn try_cheer_at(&self, navn: &str, now: Instant) -> bool {
        let mut last = self
            .inner
            .last_cheer
            .lock()
            .expect("cheer lock poisoned");
        match last.get(navn) {
            Some(prev) if now.duration_since(*prev) < CHEER_WINDOW => false,
            _ => {
                last.insert(navn.to_string(), now);
                true
            }
        }
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
    use karantene_types::events::MessagePayload;

    #[test]
    fn second_cheer_inside_window_is_rejected() {
        let dispatcher = Dispatcher::new();
        let start = Instant::now();

        assert!(dispatcher.try_cheer_at("u1 ola", start));
        assert!(!dispatcher.try_cheer_at("u1 ola", start + Duration::from_secs(30)));
        assert!(dispatcher.try_cheer_at("u1 ola", start + Duration::from_secs(61)));
    }

    #[test]
    fn rejected_cheer_does_not_extend_the_window() {
        let dispatcher = Dispatcher::new();
        let start = Instant::now();

        assert!(dispatcher.try_cheer_at("u1 ola", start));
        assert!(!dispatcher.try_cheer_at("u1 ola", start + Duration::from_secs(59)));
        // The slot still dates from the accepted cheer
        assert!(dispatcher.try_cheer_at("u1 ola", start + Duration::from_secs(60)));
    }

    #[test]
    fn identities_rate_limit_independently() {
        let dispatcher = Dispatcher::new();
        let start = Instant::now();

        assert!(dispatcher.try_cheer_at("u1 ola", start));
        assert!(dispatcher.try_cheer_at("b2 kari", start));
        assert!(!dispatcher.try_cheer_at("u1 ola", start + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let dispatcher = Dispatcher::new();
        let mut rx1 = dispatcher.subscribe();
        let mut rx2 = dispatcher.subscribe();

        dispatcher.broadcast(GatewayEvent::Cheers("u1 ola".into()));

        assert!(matches!(rx1.recv().await.unwrap(), GatewayEvent::Cheers(n) if n == "u1 ola"));
        assert!(matches!(rx2.recv().await.unwrap(), GatewayEvent::Cheers(n) if n == "u1 ola"));
    }

    #[tokio::test]
    async fn targeted_send_reaches_only_that_connection() {
        let dispatcher = Dispatcher::new();
        let (id1, mut rx1) = dispatcher.register_connection().await;
        let (_id2, mut rx2) = dispatcher.register_connection().await;

        dispatcher
            .send_to_connection(id1, GatewayEvent::CheersQuarantine("vent".into()))
            .await;

        assert!(matches!(
            rx1.recv().await.unwrap(),
            GatewayEvent::CheersQuarantine(_)
        ));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_prunes_the_connection() {
        let dispatcher = Dispatcher::new();
        let (id, _rx) = dispatcher.register_connection().await;
        assert_eq!(dispatcher.connection_count().await, 1);

        dispatcher.unregister_connection(id).await;
        assert_eq!(dispatcher.connection_count().await, 0);

        // Sending to a pruned connection is a quiet no-op
        dispatcher
            .send_to_connection(
                id,
                GatewayEvent::NewMessage(MessagePayload::Status("borte".into())),
            )
            .await;
    }
}
