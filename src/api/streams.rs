use futures::stream::{self, BoxStream, StreamExt};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::coordinator::{PlayerSnapshot, PlayerView};

use super::PLAYER;

/// Stream of player snapshots: the current one first, then every change.
///
/// Ends immediately when the player service is unavailable.
#[flutter_rust_bridge::frb(ignore)]
pub async fn player_stream() -> BoxStream<'static, PlayerSnapshot> {
    match PLAYER.as_ref() {
        Some(service) => service.coordinator.view().stream().boxed(),
        None => stream::empty().boxed(),
    }
}

/// Push player snapshots to Dart.
///
/// Every screen (dashboard, player, mini player) subscribes here and renders
/// from what it receives: the current snapshot immediately, then each change.
/// The subscription ends when Dart cancels the stream.
#[cfg(feature = "bridge")]
#[flutter_rust_bridge::frb]
pub fn player_snapshot_stream(sink: crate::frb_generated::StreamSink<PlayerSnapshot>) {
    forward_to(move |snapshot| sink.add(snapshot).is_ok());
}

/// Feed the global player's snapshots into `add` on the player runtime.
pub(crate) fn forward_to(add: impl FnMut(PlayerSnapshot) -> bool + Send + 'static) {
    let Some(service) = PLAYER.as_ref() else {
        log::warn!("[API] Snapshot subscription ignored: player service unavailable");
        return;
    };
    pump_snapshots(service.coordinator.view(), service.runtime.handle(), add);
}

/// Forward `view`'s snapshots into `add` until it reports the listener is gone.
pub(crate) fn pump_snapshots(
    view: PlayerView,
    runtime: &Handle,
    mut add: impl FnMut(PlayerSnapshot) -> bool + Send + 'static,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut snapshots = Box::pin(view.stream());
        while let Some(snapshot) = snapshots.next().await {
            if !add(snapshot) {
                log::debug!("[API] Snapshot listener closed");
                break;
            }
        }
    })
}
