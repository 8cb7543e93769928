//! Player record and input handling

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ws::protocol::KeyState;

use super::physics::{PhysicsSystem, ARENA_HEIGHT, ARENA_WIDTH};

pub const PLAYER_RADIUS: f32 = 15.0;
/// Distance moved per axis per `input` event
pub const PLAYER_SPEED: f32 = 4.0;
pub const PLAYER_VISION: f32 = 100.0;
pub const FLASHLIGHT_ARC: f32 = std::f32::consts::PI * 0.1;

const UP_KEYS: &[&str] = &["w", "arrowup"];
const DOWN_KEYS: &[&str] = &["s", "arrowdown"];
const LEFT_KEYS: &[&str] = &["a", "arrowleft"];
const RIGHT_KEYS: &[&str] = &["d", "arrowright"];
const FLASHLIGHT_KEYS: &[&str] = &[" "];

/// Slot color, first paired connection is blue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Blue,
    Red,
}

/// Authoritative player state, serialized as-is into `state` broadcasts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub mouse_x: f32,
    pub mouse_y: f32,
    pub color: PlayerColor,
    pub radius: f32,
    pub speed: f32,
    pub vision: f32,
    pub flashlight_arc: f32,
    pub flashlight_on: bool,
    pub alive: bool,
}

impl Player {
    pub fn new(color: PlayerColor, x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            mouse_x: 0.0,
            mouse_y: 0.0,
            color,
            radius: PLAYER_RADIUS,
            speed: PLAYER_SPEED,
            vision: PLAYER_VISION,
            flashlight_arc: FLASHLIGHT_ARC,
            flashlight_on: false,
            alive: true,
        }
    }

    /// Spawn at a uniformly random position that keeps the circle inside the arena
    pub fn spawn<R: Rng>(color: PlayerColor, rng: &mut R) -> Self {
        let x = rng.gen_range(PLAYER_RADIUS..=ARENA_WIDTH - PLAYER_RADIUS);
        let y = rng.gen_range(PLAYER_RADIUS..=ARENA_HEIGHT - PLAYER_RADIUS);
        Self::new(color, x, y)
    }

    /// Client canvas coordinates are trusted, no range check
    pub fn set_aim(&mut self, x: f32, y: f32) {
        self.mouse_x = x;
        self.mouse_y = y;
    }

    /// Move one step per held direction key. Axes combine without
    /// normalization, so diagonals cover `speed` on each axis.
    pub fn apply_keys(&mut self, keys: &KeyState) {
        let mut x = self.x;
        let mut y = self.y;

        if keys.any_held(UP_KEYS) {
            y -= self.speed;
        }
        if keys.any_held(DOWN_KEYS) {
            y += self.speed;
        }
        if keys.any_held(LEFT_KEYS) {
            x -= self.speed;
        }
        if keys.any_held(RIGHT_KEYS) {
            x += self.speed;
        }
        self.flashlight_on = keys.any_held(FLASHLIGHT_KEYS);

        let (x, y) = PhysicsSystem::clamp_to_arena(x, y, self.radius);
        self.x = x;
        self.y = y;
    }

    /// Death is permanent for the rest of the match
    pub fn kill(&mut self) {
        self.alive = false;
    }
}
