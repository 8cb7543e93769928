//! Match state and authoritative tick loop

use dashmap::DashMap;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

use crate::connection::ConnectionRegistry;
use crate::util::time::cooldown_elapsed;
use crate::ws::protocol::KeyState;

use super::combat::{Bullet, BulletIds, BulletOutcome, CombatSystem};
use super::player::{Player, PlayerColor};
use super::snapshot;
use super::GameError;

/// Capacity of a match's command channel
pub const COMMAND_CAPACITY: usize = 256;

/// Player event routed into a match task
#[derive(Debug, Clone)]
pub enum MatchCommand {
    Aim { conn_id: Uuid, x: f32, y: f32 },
    Input { conn_id: Uuid, keys: KeyState },
    Fire { conn_id: Uuid, at: Instant },
    /// Transport closed for this participant
    Disconnect { conn_id: Uuid },
    /// A participant acknowledged the end of the match
    End { conn_id: Uuid },
}

/// A bullet hit resolved during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub bullet_id: u64,
    pub shooter_id: Uuid,
    pub victim_id: Uuid,
}

/// Match state (owned by match task)
pub struct MatchState {
    pub id: Uuid,
    pub tick: u64,
    /// Participants in slot order, fixed at creation
    players: [(Uuid, Player); 2],
    bullets: Vec<Bullet>,
    last_fire: HashMap<Uuid, Instant>,
    fire_cooldown: Duration,
    bullet_ids: Arc<BulletIds>,
}

impl MatchState {
    /// Create a match for two paired connections. The first gets the blue slot.
    pub fn new<R: Rng>(
        id: Uuid,
        participants: [Uuid; 2],
        rng: &mut R,
        bullet_ids: Arc<BulletIds>,
        fire_cooldown: Duration,
    ) -> Self {
        let [first, second] = participants;
        let players = [
            (first, Player::spawn(PlayerColor::Blue, rng)),
            (second, Player::spawn(PlayerColor::Red, rng)),
        ];

        Self {
            id,
            tick: 0,
            players,
            bullets: Vec::new(),
            last_fire: HashMap::new(),
            fire_cooldown,
            bullet_ids,
        }
    }

    pub fn players(&self) -> &[(Uuid, Player)] {
        &self.players
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn participants(&self) -> [Uuid; 2] {
        [self.players[0].0, self.players[1].0]
    }

    pub fn player(&self, conn_id: &Uuid) -> Option<&Player> {
        self.players
            .iter()
            .find(|(id, _)| id == conn_id)
            .map(|(_, p)| p)
    }

    fn player_mut(&mut self, conn_id: &Uuid) -> Result<&mut Player, GameError> {
        self.players
            .iter_mut()
            .find(|(id, _)| id == conn_id)
            .map(|(_, p)| p)
            .ok_or(GameError::StaleReference)
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|(_, p)| p.alive).count()
    }

    /// Overwrite the aim point
    pub fn set_aim(&mut self, conn_id: &Uuid, x: f32, y: f32) -> Result<(), GameError> {
        self.player_mut(conn_id)?.set_aim(x, y);
        Ok(())
    }

    /// Apply one frame of movement keys. Dead players keep moving and
    /// can still toggle the flashlight.
    pub fn apply_input(&mut self, conn_id: &Uuid, keys: &KeyState) -> Result<(), GameError> {
        self.player_mut(conn_id)?.apply_keys(keys);
        Ok(())
    }

    /// Spawn a bullet toward the player's aim point, returns its id
    pub fn request_fire(&mut self, conn_id: &Uuid, now: Instant) -> Result<u64, GameError> {
        let last = self.last_fire.get(conn_id).copied();
        if !self.fire_cooldown.is_zero() && !cooldown_elapsed(last, now, self.fire_cooldown) {
            return Err(GameError::FireCooldown);
        }

        let owner = *conn_id;
        let shooter = self.player_mut(conn_id)?.clone();
        // Id is only consumed once the shot is known to be valid
        let probe = Bullet::aimed(0, owner, &shooter)?;
        let bullet = Bullet {
            id: self.bullet_ids.next(),
            ..probe
        };

        let id = bullet.id;
        self.bullets.push(bullet);
        self.last_fire.insert(owner, now);
        Ok(id)
    }

    /// Transport loss kills the player but leaves the match running
    pub fn mark_disconnected(&mut self, conn_id: &Uuid) -> Result<(), GameError> {
        self.player_mut(conn_id)?.kill();
        Ok(())
    }

    /// Advance all bullets by one tick and resolve hits, in bullet order
    pub fn step(&mut self) -> Vec<Kill> {
        self.tick += 1;

        let mut kills = Vec::new();
        let mut bullets = std::mem::take(&mut self.bullets);

        bullets.retain_mut(|bullet| match CombatSystem::advance_bullet(bullet, &self.players) {
            BulletOutcome::Retained => true,
            BulletOutcome::OutOfBounds => false,
            BulletOutcome::Hit(slot) => {
                let (victim_id, victim) = &mut self.players[slot];
                victim.kill();
                kills.push(Kill {
                    bullet_id: bullet.id,
                    shooter_id: bullet.owner,
                    victim_id: *victim_id,
                });
                false
            }
        });

        self.bullets = bullets;
        kills
    }

    /// Apply one routed command, returns false when the match should end
    pub fn apply(&mut self, command: MatchCommand) -> Result<bool, GameError> {
        match command {
            MatchCommand::Aim { conn_id, x, y } => self.set_aim(&conn_id, x, y)?,
            MatchCommand::Input { conn_id, keys } => self.apply_input(&conn_id, &keys)?,
            MatchCommand::Fire { conn_id, at } => {
                self.request_fire(&conn_id, at)?;
            }
            MatchCommand::Disconnect { conn_id } => self.mark_disconnected(&conn_id)?,
            MatchCommand::End { conn_id } => {
                self.player_mut(&conn_id)?;
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub participants: [Uuid; 2],
    pub command_tx: mpsc::Sender<MatchCommand>,
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative game match
pub struct GameMatch {
    state: MatchState,
    command_rx: mpsc::Receiver<MatchCommand>,
    connections: Arc<ConnectionRegistry>,
    tick_interval: Duration,
}

impl GameMatch {
    /// Create a new match and the handle used to route commands into it
    pub fn new(
        state: MatchState,
        connections: Arc<ConnectionRegistry>,
        tick_interval: Duration,
    ) -> (Self, MatchHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let handle = MatchHandle {
            id: state.id,
            participants: state.participants(),
            command_tx,
        };

        let game_match = Self {
            state,
            command_rx,
            connections,
            tick_interval,
        };

        (game_match, handle)
    }

    /// Run the authoritative tick loop until the match is ended or abandoned
    pub async fn run(mut self) {
        info!(match_id = %self.state.id, "Match started");

        let mut tick_interval = interval(self.tick_interval);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            // Drain commands that arrived since the last tick
            if !self.process_commands() {
                info!(match_id = %self.state.id, "Match ended by participant");
                break;
            }

            self.reap_disconnected();

            let kills = self.state.step();
            for kill in &kills {
                info!(
                    match_id = %self.state.id,
                    shooter_id = %kill.shooter_id,
                    victim_id = %kill.victim_id,
                    bullet_id = kill.bullet_id,
                    "Player killed"
                );
            }
            if !kills.is_empty() && self.state.alive_count() <= 1 {
                info!(
                    match_id = %self.state.id,
                    tick = self.state.tick,
                    survivors = self.state.alive_count(),
                    "Match decided"
                );
            }

            self.broadcast_state();

            if self.is_abandoned() {
                info!(match_id = %self.state.id, "All participants gone, ending match");
                break;
            }
        }

        debug!(match_id = %self.state.id, ticks = self.state.tick, "Match loop finished");
    }

    /// Apply queued commands in arrival order. Returns false once the match
    /// should stop.
    fn process_commands(&mut self) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => match self.state.apply(command) {
                    Ok(true) => {}
                    Ok(false) => return false,
                    Err(e) => {
                        debug!(match_id = %self.state.id, error = %e, "Command rejected");
                    }
                },
                Err(TryRecvError::Empty) => return true,
                // Handle dropped from the registry, the match was torn down
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Participants whose connection vanished without a routed disconnect
    /// are treated as disconnected.
    fn reap_disconnected(&mut self) {
        let gone: Vec<Uuid> = self
            .state
            .players()
            .iter()
            .filter(|(id, p)| p.alive && !self.connections.is_connected(id))
            .map(|(id, _)| *id)
            .collect();

        for conn_id in gone {
            let _ = self.state.mark_disconnected(&conn_id);
        }
    }

    fn is_abandoned(&self) -> bool {
        !self
            .state
            .participants()
            .iter()
            .any(|id| self.connections.is_connected(id))
    }

    fn broadcast_state(&self) {
        let msg = snapshot::build(&self.state);
        for conn_id in self.state.participants() {
            self.connections.send_to(&conn_id, msg.clone());
        }
    }
}
