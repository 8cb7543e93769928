//! Single entry point for client events

use std::time::Instant;

use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::game::{GameError, MatchCommand};
use crate::ws::protocol::ClientMsg;

use super::lifecycle;
use super::AppState;

/// Route one client event. Errors are for logging only, the peer never
/// hears about a rejected event.
pub fn dispatch(state: &AppState, conn_id: Uuid, msg: ClientMsg) -> Result<(), GameError> {
    match msg {
        ClientMsg::JoinQueue => state.matchmaking.join_queue(conn_id).map(|_| ()),
        ClientMsg::Mousemove { x, y } => route(state, conn_id, MatchCommand::Aim { conn_id, x, y }),
        ClientMsg::Input { keys } => route(state, conn_id, MatchCommand::Input { conn_id, keys }),
        ClientMsg::Fire => route(
            state,
            conn_id,
            MatchCommand::Fire {
                conn_id,
                at: Instant::now(),
            },
        ),
        ClientMsg::GameOver => lifecycle::end_match(state, conn_id).map(|_| ()),
    }
}

/// Forward a command to the task owning the connection's match
fn route(state: &AppState, conn_id: Uuid, command: MatchCommand) -> Result<(), GameError> {
    let match_id = state
        .connections
        .match_of(&conn_id)
        .ok_or(GameError::StaleReference)?;
    let game_match = state
        .match_registry
        .get(&match_id)
        .ok_or(GameError::StaleReference)?;

    game_match.command_tx.try_send(command).map_err(|e| match e {
        TrySendError::Full(_) => GameError::MatchBusy,
        TrySendError::Closed(_) => GameError::StaleReference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::lifecycle::{on_connect, on_disconnect};
    use crate::config::Config;
    use crate::game::Player;
    use crate::ws::protocol::{KeyState, ServerMsg};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn test_state() -> AppState {
        AppState::new(Config {
            tick_interval: Duration::from_millis(10),
            ..Config::default()
        })
    }

    fn connect(state: &AppState) -> (Uuid, mpsc::Receiver<ServerMsg>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(256);
        on_connect(state, id, tx);
        (id, rx)
    }

    /// Wait for a `state` broadcast satisfying `pred`
    async fn next_state<F>(rx: &mut mpsc::Receiver<ServerMsg>, pred: F) -> BTreeMap<Uuid, Player>
    where
        F: Fn(&BTreeMap<Uuid, Player>, usize) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let msg = tokio::time::timeout_at(deadline, rx.recv())
                .await
                .expect("timed out waiting for state")
                .expect("outbox closed");
            if let ServerMsg::State { players, bullets } = msg {
                if pred(&players, bullets.len()) {
                    return players;
                }
            }
        }
    }

    async fn paired(state: &AppState) -> (Uuid, mpsc::Receiver<ServerMsg>, Uuid, mpsc::Receiver<ServerMsg>) {
        let (a, rx_a) = connect(state);
        let (b, rx_b) = connect(state);
        dispatch(state, a, ClientMsg::JoinQueue).unwrap();
        dispatch(state, b, ClientMsg::JoinQueue).unwrap();
        (a, rx_a, b, rx_b)
    }

    #[tokio::test]
    async fn events_without_a_match_are_stale() {
        let state = test_state();
        let (a, _rx) = connect(&state);

        assert_eq!(
            dispatch(&state, a, ClientMsg::Mousemove { x: 1.0, y: 2.0 }),
            Err(GameError::StaleReference)
        );
        assert_eq!(
            dispatch(&state, a, ClientMsg::Input { keys: KeyState::from([("w", true)]) }),
            Err(GameError::StaleReference)
        );
        assert_eq!(dispatch(&state, a, ClientMsg::Fire), Err(GameError::StaleReference));
        assert_eq!(dispatch(&state, a, ClientMsg::GameOver), Err(GameError::StaleReference));
    }

    #[tokio::test]
    async fn pairing_sends_start_game_then_state() {
        let state = test_state();
        let (a, mut rx_a, b, mut rx_b) = paired(&state).await;

        for (me, rx) in [(a, &mut rx_a), (b, &mut rx_b)] {
            let start = loop {
                match rx.recv().await {
                    Some(ServerMsg::Count { .. }) => continue,
                    other => break other,
                }
            };
            assert!(matches!(start, Some(ServerMsg::StartGame { self_id }) if self_id == me));
        }

        let players = next_state(&mut rx_a, |_, _| true).await;
        assert_eq!(players.len(), 2);
        assert_eq!(players[&a].color, crate::game::PlayerColor::Blue);
        assert_eq!(players[&b].color, crate::game::PlayerColor::Red);
        assert!(players.values().all(|p| p.radius == 15.0 && p.alive));
    }

    #[tokio::test]
    async fn shot_at_stationary_opponent_kills_it() {
        let state = test_state();
        let (a, mut rx_a, b, mut rx_b) = paired(&state).await;

        let players = next_state(&mut rx_a, |_, _| true).await;
        let target = &players[&b];
        dispatch(&state, a, ClientMsg::Mousemove { x: target.x, y: target.y }).unwrap();
        dispatch(&state, a, ClientMsg::Fire).unwrap();

        let players = next_state(&mut rx_b, |players, bullets| !players[&b].alive && bullets == 0).await;
        assert!(players[&a].alive);
    }

    #[tokio::test]
    async fn disconnect_mid_match_kills_only_the_leaver() {
        let state = test_state();
        let (a, _rx_a, b, mut rx_b) = paired(&state).await;
        let match_id = state.connections.match_of(&b).unwrap();

        on_disconnect(&state, a);

        let players = next_state(&mut rx_b, |players, _| !players[&a].alive).await;
        assert!(players[&b].alive);
        assert!(state.match_registry.get(&match_id).is_some());

        // Still ticking until acknowledged
        next_state(&mut rx_b, |_, _| true).await;
        dispatch(&state, b, ClientMsg::GameOver).unwrap();
        assert!(state.match_registry.get(&match_id).is_none());
        assert_eq!(dispatch(&state, b, ClientMsg::GameOver), Err(GameError::StaleReference));
        assert_eq!(dispatch(&state, b, ClientMsg::Fire), Err(GameError::StaleReference));
    }

    #[tokio::test]
    async fn movement_input_reaches_the_match() {
        let state = test_state();
        let (a, mut rx_a, _b, _rx_b) = paired(&state).await;

        let before = next_state(&mut rx_a, |_, _| true).await[&a].clone();
        let keys = if before.y > 360.0 { "w" } else { "s" };
        dispatch(&state, a, ClientMsg::Input { keys: KeyState::from([(keys, true), (" ", true)]) })
            .unwrap();

        let players = next_state(&mut rx_a, |players, _| players[&a].flashlight_on).await;
        assert_eq!((players[&a].y - before.y).abs(), 4.0);
        assert_eq!(players[&a].x, before.x);
    }
}
