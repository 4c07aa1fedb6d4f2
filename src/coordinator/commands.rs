use std::sync::Weak;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::session::SessionSpec;

use super::SessionCoordinator;

/// Bounded depth of the command queue; `try_send` reports `Full` beyond it.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Fire-and-forget player command, applied strictly in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "session", rename_all = "snake_case")]
pub enum PlayerCommand {
    Start(SessionSpec),
    TogglePlayPause,
    Close,
}

pub(super) fn spawn_command_worker(
    coordinator: Weak<SessionCoordinator>,
    mut commands: mpsc::Receiver<PlayerCommand>,
) {
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            let Some(coordinator) = coordinator.upgrade() else {
                break;
            };
            // failures are logged inside the coordinator
            let _ = coordinator.execute(command).await;
        }
    });
}
