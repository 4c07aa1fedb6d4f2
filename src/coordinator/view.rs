use std::sync::{Arc, RwLock};

use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::state::PlayerSnapshot;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

struct SnapshotStore {
    current: RwLock<PlayerSnapshot>,
    tx: broadcast::Sender<PlayerSnapshot>,
}

/// Read-only handle on the published player snapshot.
///
/// Cloning is cheap; every clone observes the same store.
#[derive(Clone)]
pub struct PlayerView {
    store: Arc<SnapshotStore>,
}

impl PlayerView {
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.store
            .current
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn is_visible(&self) -> bool {
        self.store
            .current
            .read()
            .map(|snapshot| snapshot.is_visible)
            .unwrap_or_else(|err| err.into_inner().is_visible)
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerSnapshot> {
        self.store.tx.subscribe()
    }

    /// Current snapshot followed by every later one. Lagged items are skipped.
    pub fn stream(&self) -> impl Stream<Item = PlayerSnapshot> + Send + 'static {
        let rx = self.subscribe();
        let current = self.snapshot();
        tokio_stream::once(current).chain(BroadcastStream::new(rx).filter_map(Result::ok))
    }
}

/// Write side of the snapshot store, held only by the coordinator.
pub(crate) struct SnapshotPublisher {
    store: Arc<SnapshotStore>,
}

impl SnapshotPublisher {
    pub fn new() -> (Self, PlayerView) {
        let (tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let store = Arc::new(SnapshotStore {
            current: RwLock::new(PlayerSnapshot::idle()),
            tx,
        });
        (
            Self {
                store: Arc::clone(&store),
            },
            PlayerView { store },
        )
    }

    pub fn publish(&self, snapshot: PlayerSnapshot) {
        *self
            .store
            .current
            .write()
            .unwrap_or_else(|err| err.into_inner()) = snapshot.clone();
        let _ = self.store.tx.send(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn visible() -> PlayerSnapshot {
        PlayerSnapshot {
            is_visible: true,
            is_playing: true,
            current_session: Some(Session::new("s", "S", "Relax", 8.0, 60).unwrap()),
            progress: 0.0,
            current_time_seconds: 0.0,
        }
    }

    #[tokio::test]
    async fn subscribers_see_published_snapshots() {
        let (publisher, view) = SnapshotPublisher::new();
        let mut rx = view.subscribe();

        publisher.publish(visible());

        assert_eq!(rx.recv().await.unwrap(), visible());
        assert!(view.is_visible());
        assert_eq!(view.snapshot(), visible());
    }

    #[tokio::test]
    async fn stream_starts_with_current_snapshot() {
        let (publisher, view) = SnapshotPublisher::new();
        let mut stream = Box::pin(view.stream());

        assert_eq!(stream.next().await, Some(PlayerSnapshot::idle()));
        publisher.publish(visible());
        assert_eq!(stream.next().await, Some(visible()));
    }
}
