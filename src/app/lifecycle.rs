//! Connect, disconnect and end-of-match handling

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::{GameError, MatchCommand};
use crate::util::time::unix_millis;
use crate::ws::protocol::ServerMsg;

use super::AppState;

/// Register a new connection and broadcast the new online count
pub fn on_connect(state: &AppState, conn_id: Uuid, tx: mpsc::Sender<ServerMsg>) -> usize {
    let online = state.connections.register(conn_id, tx);
    info!(conn_id = %conn_id, online, "Connection opened");
    state.connections.broadcast(&ServerMsg::Count { online });
    online
}

/// Tear down a closed connection. A player in a live match is marked dead,
/// the match itself keeps running for the other participant.
pub fn on_disconnect(state: &AppState, conn_id: Uuid) {
    // Leave the queue first so a concurrent pairing cannot pick this
    // connection after its match reference has been read
    if state.matchmaking.leave_queue(conn_id) {
        debug!(conn_id = %conn_id, "Removed from matchmaking queue");
    }

    let Some(handle) = state.connections.unregister(conn_id) else {
        return;
    };

    let online = state.connections.online();
    info!(
        conn_id = %conn_id,
        online,
        session_ms = unix_millis().saturating_sub(handle.connected_at),
        "Connection closed"
    );
    state.connections.broadcast(&ServerMsg::Count { online });

    let Some(game_match) = handle
        .match_id
        .and_then(|match_id| state.match_registry.get(&match_id))
    else {
        return;
    };

    let command = MatchCommand::Disconnect { conn_id };
    match game_match.command_tx.try_send(command) {
        Ok(()) | Err(TrySendError::Closed(_)) => {}
        Err(TrySendError::Full(command)) => {
            // Must not be lost, wait for room outside the caller
            tokio::spawn(async move {
                let _ = game_match.command_tx.send(command).await;
            });
        }
    }
}

/// Destroy the caller's match for both participants. Repeated calls are no-ops.
pub fn end_match(state: &AppState, conn_id: Uuid) -> Result<Uuid, GameError> {
    let match_id = state
        .connections
        .match_of(&conn_id)
        .ok_or(GameError::StaleReference)?;
    let handle = state
        .matchmaking
        .release_match(match_id)
        .ok_or(GameError::StaleReference)?;

    let _ = handle.command_tx.try_send(MatchCommand::End { conn_id });
    info!(match_id = %match_id, conn_id = %conn_id, "Match ended by participant");
    Ok(match_id)
}
