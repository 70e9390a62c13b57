use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{Rect, Vec2};

/// Below this length the move direction falls back to [`Vec2::RIGHT`].
const MIN_DIRECTION_LENGTH: f32 = 1.0e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WanderTarget {
    pub position: Vec2,
    /// Unit vector from the pick position toward `position`, used by the squish effect.
    pub direction: Vec2,
}

/// Picks wander destinations along the current ground line and wait durations between them.
#[derive(Debug, Clone)]
pub struct WanderPlanner {
    rng: StdRng,
}

impl WanderPlanner {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform X inside the clamped range, Y locked to `ground_y`. `None` when
    /// the arena is not wider than the body.
    pub fn pick_target(
        &mut self,
        arena: Rect,
        half_extents: Vec2,
        current: Vec2,
        ground_y: f32,
    ) -> Option<WanderTarget> {
        let (min_x, max_x) = wander_range(arena, half_extents.x)?;
        let position = Vec2::new(self.rng.random_range(min_x..=max_x), ground_y);
        Some(WanderTarget {
            position,
            direction: move_direction(current, position),
        })
    }

    pub fn sample_wait(&mut self, min_seconds: f32, max_seconds: f32) -> f32 {
        if min_seconds >= max_seconds {
            return min_seconds;
        }
        self.rng.random_range(min_seconds..=max_seconds)
    }
}

/// Horizontal range of valid body centers, or `None` when degenerate.
pub fn wander_range(arena: Rect, half_width: f32) -> Option<(f32, f32)> {
    let min_x = arena.left + half_width;
    let max_x = arena.right - half_width;
    (min_x < max_x).then_some((min_x, max_x))
}

pub fn move_direction(from: Vec2, to: Vec2) -> Vec2 {
    let delta = to - from;
    let length = delta.length();
    if length <= MIN_DIRECTION_LENGTH {
        return Vec2::RIGHT;
    }
    delta * length.recip()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF: Vec2 = Vec2::new(5.0, 5.0);

    #[test]
    fn targets_stay_inside_clamped_range() {
        let mut planner = WanderPlanner::with_seed(7);
        let arena = Rect::new(-40.0, 60.0, 0.0, 50.0);
        for _ in 0..500 {
            let target = planner
                .pick_target(arena, HALF, Vec2::new(0.0, 5.0), 5.0)
                .expect("wide arena yields targets");
            assert!(target.position.x >= -35.0 && target.position.x <= 55.0);
            assert_eq!(target.position.y, 5.0);
        }
    }

    #[test]
    fn degenerate_arena_yields_no_target() {
        let mut planner = WanderPlanner::with_seed(1);
        let narrow = Rect::new(0.0, 10.0, 0.0, 50.0);
        assert!(planner
            .pick_target(narrow, HALF, Vec2::new(5.0, 5.0), 5.0)
            .is_none());
        assert_eq!(wander_range(Rect::new(0.0, 8.0, 0.0, 1.0), 5.0), None);
    }

    #[test]
    fn direction_is_unit_length() {
        let direction = move_direction(Vec2::new(0.0, 0.0), Vec2::new(-30.0, 40.0));
        assert!((direction.length() - 1.0).abs() < 1.0e-6);
        assert!((direction.x + 0.6).abs() < 1.0e-6);
    }

    #[test]
    fn zero_distance_direction_falls_back_to_right() {
        let here = Vec2::new(12.0, 5.0);
        assert_eq!(move_direction(here, here), Vec2::RIGHT);
    }

    #[test]
    fn wait_samples_stay_in_range() {
        let mut planner = WanderPlanner::with_seed(3);
        for _ in 0..500 {
            let wait = planner.sample_wait(1.0, 4.0);
            assert!((1.0..=4.0).contains(&wait));
        }
        assert_eq!(planner.sample_wait(2.0, 2.0), 2.0);
    }

    #[test]
    fn same_seed_repeats_targets() {
        let arena = Rect::new(0.0, 100.0, 0.0, 50.0);
        let mut a = WanderPlanner::with_seed(42);
        let mut b = WanderPlanner::with_seed(42);
        for _ in 0..10 {
            assert_eq!(
                a.pick_target(arena, HALF, Vec2::new(50.0, 5.0), 5.0),
                b.pick_target(arena, HALF, Vec2::new(50.0, 5.0), 5.0)
            );
        }
    }
}
