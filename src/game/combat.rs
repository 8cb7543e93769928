//! Combat system - bullets, firing, hit detection

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::physics::PhysicsSystem;
use super::player::Player;
use super::GameError;

pub const BULLET_RADIUS: f32 = 2.0;
/// Distance a bullet covers per tick
pub const BULLET_SPEED: f32 = 100.0;

/// Process-wide bullet id source, ids are never reused
#[derive(Debug, Default)]
pub struct BulletIds(AtomicU64);

impl BulletIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Bullet in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bullet {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub speed_x: f32,
    pub speed_y: f32,
    pub owner: Uuid,
}

impl Bullet {
    /// Fire from the shooter's center toward its aim point
    pub fn aimed(id: u64, owner: Uuid, shooter: &Player) -> Result<Self, GameError> {
        let dx = shooter.mouse_x - shooter.x;
        let dy = shooter.mouse_y - shooter.y;
        let dist = dx.hypot(dy);
        if dist == 0.0 || !dist.is_finite() {
            return Err(GameError::DegenerateAim);
        }

        let f = BULLET_SPEED / dist;
        Ok(Self {
            id,
            x: shooter.x,
            y: shooter.y,
            radius: BULLET_RADIUS,
            speed_x: dx * f,
            speed_y: dy * f,
            owner,
        })
    }
}

/// What happened to a bullet during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletOutcome {
    /// Still flying
    Retained,
    /// Was already outside the arena when the tick began
    OutOfBounds,
    /// Hit the player at this slot index
    Hit(usize),
}

/// Combat system for advancing bullets
pub struct CombatSystem;

impl CombatSystem {
    /// Advance one bullet through its sub-steps, testing every living
    /// non-owner player after each step. Players are scanned in slot order
    /// and the first overlap wins.
    pub fn advance_bullet(bullet: &mut Bullet, players: &[(Uuid, Player)]) -> BulletOutcome {
        if !PhysicsSystem::in_arena(bullet.x, bullet.y) {
            return BulletOutcome::OutOfBounds;
        }

        let steps = PhysicsSystem::sub_steps(bullet.speed_x, bullet.speed_y, bullet.radius);
        let step_x = bullet.speed_x / steps as f32;
        let step_y = bullet.speed_y / steps as f32;

        for _ in 0..steps {
            bullet.x += step_x;
            bullet.y += step_y;

            let hit = players.iter().position(|(id, p)| {
                *id != bullet.owner
                    && p.alive
                    && PhysicsSystem::circles_overlap(
                        bullet.x, bullet.y, bullet.radius, p.x, p.y, p.radius,
                    )
            });
            if let Some(slot) = hit {
                return BulletOutcome::Hit(slot);
            }
        }

        BulletOutcome::Retained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::PlayerColor;

    fn shooter_at(x: f32, y: f32, aim: (f32, f32)) -> Player {
        let mut p = Player::new(PlayerColor::Blue, x, y);
        p.set_aim(aim.0, aim.1);
        p
    }

    #[test]
    fn bullet_ids_are_monotonic() {
        let ids = BulletIds::new();
        let a = ids.next();
        let b = ids.next();
        let c = ids.next();
        assert!(a < b && b < c);
    }

    #[test]
    fn aimed_bullet_has_fixed_speed() {
        let owner = Uuid::new_v4();
        let bullet = Bullet::aimed(0, owner, &shooter_at(100.0, 100.0, (103.0, 104.0))).unwrap();
        assert!((bullet.speed_x - 60.0).abs() < 1e-4);
        assert!((bullet.speed_y - 80.0).abs() < 1e-4);
        assert_eq!((bullet.x, bullet.y), (100.0, 100.0));
        assert_eq!(bullet.radius, BULLET_RADIUS);
        assert_eq!(bullet.owner, owner);
    }

    #[test]
    fn zero_distance_aim_is_rejected() {
        let result = Bullet::aimed(0, Uuid::new_v4(), &shooter_at(50.0, 50.0, (50.0, 50.0)));
        assert_eq!(result, Err(GameError::DegenerateAim));
    }

    #[test]
    fn bullet_moves_one_tick_of_travel() {
        let owner = Uuid::new_v4();
        let mut bullet = Bullet::aimed(0, owner, &shooter_at(100.0, 100.0, (200.0, 100.0))).unwrap();
        let players = vec![(owner, shooter_at(100.0, 100.0, (200.0, 100.0)))];

        assert_eq!(CombatSystem::advance_bullet(&mut bullet, &players), BulletOutcome::Retained);
        assert!((bullet.x - 200.0).abs() < 1e-3);
        assert_eq!(bullet.y, 100.0);
    }

    #[test]
    fn bullet_never_hits_its_owner() {
        let owner = Uuid::new_v4();
        let shooter = shooter_at(300.0, 300.0, (400.0, 300.0));
        let mut bullet = Bullet::aimed(0, owner, &shooter).unwrap();
        // Owner overlaps every sub-step of the first stretch
        let players = vec![(owner, shooter)];
        assert_eq!(CombatSystem::advance_bullet(&mut bullet, &players), BulletOutcome::Retained);
    }

    #[test]
    fn thin_target_is_not_tunnelled() {
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        let mut bullet = Bullet::aimed(0, owner, &shooter_at(100.0, 100.0, (200.0, 100.0))).unwrap();
        let mut victim = Player::new(PlayerColor::Red, 150.0, 100.0);
        victim.radius = 1.0;
        let players = vec![(target, victim)];

        assert_eq!(CombatSystem::advance_bullet(&mut bullet, &players), BulletOutcome::Hit(0));
        assert!(bullet.x < 200.0);
    }

    #[test]
    fn dead_players_are_ignored() {
        let owner = Uuid::new_v4();
        let mut bullet = Bullet::aimed(0, owner, &shooter_at(100.0, 100.0, (200.0, 100.0))).unwrap();
        let mut corpse = Player::new(PlayerColor::Red, 150.0, 100.0);
        corpse.kill();
        let players = vec![(Uuid::new_v4(), corpse)];

        assert_eq!(CombatSystem::advance_bullet(&mut bullet, &players), BulletOutcome::Retained);
    }

    #[test]
    fn first_enumerated_player_wins_a_tie() {
        let owner = Uuid::new_v4();
        let mut bullet = Bullet::aimed(0, owner, &shooter_at(100.0, 100.0, (200.0, 100.0))).unwrap();
        let players = vec![
            (Uuid::new_v4(), Player::new(PlayerColor::Blue, 150.0, 100.0)),
            (Uuid::new_v4(), Player::new(PlayerColor::Red, 150.0, 100.0)),
        ];
        assert_eq!(CombatSystem::advance_bullet(&mut bullet, &players), BulletOutcome::Hit(0));
    }

    #[test]
    fn bullet_outside_arena_is_dropped_before_moving() {
        let mut bullet = Bullet {
            id: 1,
            x: -1.0,
            y: 10.0,
            radius: BULLET_RADIUS,
            speed_x: 100.0,
            speed_y: 0.0,
            owner: Uuid::new_v4(),
        };
        assert_eq!(CombatSystem::advance_bullet(&mut bullet, &[]), BulletOutcome::OutOfBounds);
        assert_eq!(bullet.x, -1.0);
    }
}
