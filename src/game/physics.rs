//! Arena geometry and circle collision

/// Arena width in pixels, shared with the client at build time
pub const ARENA_WIDTH: f32 = 1280.0;
/// Arena height in pixels, shared with the client at build time
pub const ARENA_HEIGHT: f32 = 720.0;

/// Physics helpers for movement bounds and hit tests
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Check if a point lies inside the arena (edges inclusive)
    pub fn in_arena(x: f32, y: f32) -> bool {
        (0.0..=ARENA_WIDTH).contains(&x) && (0.0..=ARENA_HEIGHT).contains(&y)
    }

    /// Clamp a circle's center so the whole circle stays inside the arena
    pub fn clamp_to_arena(x: f32, y: f32, radius: f32) -> (f32, f32) {
        (
            x.max(radius).min(ARENA_WIDTH - radius),
            y.max(radius).min(ARENA_HEIGHT - radius),
        )
    }

    /// Strict circle overlap test on squared distances
    pub fn circles_overlap(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
        let dx = x1 - x2;
        let dy = y1 - y2;
        let r = r1 + r2;
        dx * dx + dy * dy < r * r
    }

    /// Number of sub-steps needed so a body of `radius` moving at (`vx`, `vy`)
    /// per tick never travels more than one radius per step
    pub fn sub_steps(vx: f32, vy: f32, radius: f32) -> u32 {
        let speed = vx.hypot(vy);
        if radius <= 0.0 || !speed.is_finite() {
            return 1;
        }
        ((speed / radius).ceil() as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_edges_are_inside() {
        assert!(PhysicsSystem::in_arena(0.0, 0.0));
        assert!(PhysicsSystem::in_arena(ARENA_WIDTH, ARENA_HEIGHT));
        assert!(!PhysicsSystem::in_arena(-0.1, 10.0));
        assert!(!PhysicsSystem::in_arena(10.0, ARENA_HEIGHT + 0.1));
    }

    #[test]
    fn clamp_keeps_circle_inside() {
        assert_eq!(PhysicsSystem::clamp_to_arena(-50.0, 2000.0, 15.0), (15.0, 705.0));
        assert_eq!(PhysicsSystem::clamp_to_arena(640.0, 360.0, 15.0), (640.0, 360.0));
    }

    #[test]
    fn touching_circles_do_not_overlap() {
        assert!(!PhysicsSystem::circles_overlap(0.0, 0.0, 15.0, 17.0, 0.0, 2.0));
        assert!(PhysicsSystem::circles_overlap(0.0, 0.0, 15.0, 16.9, 0.0, 2.0));
    }

    #[test]
    fn sub_steps_bound_travel_to_one_radius() {
        assert_eq!(PhysicsSystem::sub_steps(100.0, 0.0, 2.0), 50);
        assert_eq!(PhysicsSystem::sub_steps(60.0, 80.0, 2.0), 50);
        assert_eq!(PhysicsSystem::sub_steps(3.0, 0.0, 2.0), 2);
        assert_eq!(PhysicsSystem::sub_steps(0.0, 0.0, 2.0), 1);

        for (vx, vy) in [(100.0_f32, 0.0_f32), (70.7, 70.7), (-33.0, 94.4), (1.0, 1.0)] {
            let steps = PhysicsSystem::sub_steps(vx, vy, 2.0) as f32;
            let per_step = (vx / steps).hypot(vy / steps);
            assert!(per_step <= 2.0 + 1e-4, "step of {per_step} for ({vx}, {vy})");
        }
    }
}
