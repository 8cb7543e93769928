//! Game simulation modules

pub mod combat;
pub mod r#match;
pub mod physics;
pub mod player;
pub mod snapshot;

pub use combat::{Bullet, BulletIds};
pub use player::{Player, PlayerColor};
pub use r#match::{GameMatch, MatchCommand, MatchHandle, MatchRegistry, MatchState};

/// Reasons a player event is rejected. None of these reach the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Event refers to a connection with no live match or player
    #[error("connection has no player in a live match")]
    StaleReference,

    /// Fire requested with the aim point exactly on the player
    #[error("aim point coincides with player position")]
    DegenerateAim,

    #[error("fire cooldown has not elapsed")]
    FireCooldown,

    #[error("matchmaking queue is full")]
    QueueFull,

    /// Match command channel is saturated
    #[error("match is not accepting commands")]
    MatchBusy,
}
