use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};

use crate::coordinator::PlayerView;

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

pub type SnapshotStream = Sse<EventStream>;

/// Build a Server-Sent Events stream of player snapshots.
pub fn snapshots(view: PlayerView) -> SnapshotStream {
    let stream = view.stream().filter_map(|snapshot| async move {
        serde_json::to_string(&snapshot)
            .ok()
            .map(|payload| Ok::<_, Infallible>(Event::default().event("player").data(payload)))
    });
    let stream: EventStream = Box::pin(stream);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("debug-keepalive"),
    )
}
