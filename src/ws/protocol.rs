//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{Bullet, Player};

/// Pressed/released state of the client's keyboard, keyed by lower-cased key name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyState(pub HashMap<String, bool>);

impl KeyState {
    /// True if any of the given key names is held down
    pub fn any_held(&self, names: &[&str]) -> bool {
        self.0
            .iter()
            .any(|(key, held)| *held && names.iter().any(|n| key.eq_ignore_ascii_case(n)))
    }
}

impl<const N: usize> From<[(&str, bool); N]> for KeyState {
    fn from(pairs: [(&str, bool); N]) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Enter the matchmaking queue
    JoinQueue,

    /// Aim point in arena coordinates
    Mousemove { x: f32, y: f32 },

    /// Movement and flashlight keys
    Input { keys: KeyState },

    /// Fire toward the current aim point
    Fire,

    /// Client saw the match end and leaves it
    GameOver,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Number of connected peers
    Count { online: usize },

    /// A match was formed; tells the client which player is theirs
    #[serde(rename_all = "camelCase")]
    StartGame { self_id: Uuid },

    /// Full match state, sent every tick
    State {
        players: BTreeMap<Uuid, Player>,
        bullets: Vec<Bullet>,
    },
}
