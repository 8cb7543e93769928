//! Snapshot building for network transmission

use std::collections::BTreeMap;

use crate::ws::protocol::ServerMsg;

use super::MatchState;

/// Build the full-state `state` message for a match. Every tick sends the
/// complete player map and bullet list, never a delta.
pub fn build(state: &MatchState) -> ServerMsg {
    let players: BTreeMap<_, _> = state
        .players()
        .iter()
        .map(|(id, player)| (*id, player.clone()))
        .collect();

    ServerMsg::State {
        players,
        bullets: state.bullets().to_vec(),
    }
}
