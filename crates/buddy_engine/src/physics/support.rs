use crate::geometry::{Rect, Vec2};

use super::obstacles::ObstacleRegistry;

/// Floor and platform queries for a body with the given half extents.
/// Pure functions of the arena, the body size and current obstacle geometry.
#[derive(Debug, Clone, Copy)]
pub struct SupportResolver<'a> {
    arena: Rect,
    half_extents: Vec2,
    tolerance: f32,
    obstacles: &'a ObstacleRegistry,
}

impl<'a> SupportResolver<'a> {
    pub fn new(
        arena: Rect,
        half_extents: Vec2,
        tolerance: f32,
        obstacles: &'a ObstacleRegistry,
    ) -> Self {
        Self {
            arena,
            half_extents,
            tolerance,
            obstacles,
        }
    }

    /// Center Y of a body resting on the floor.
    pub fn floor_y(&self) -> f32 {
        self.arena.bottom + self.half_extents.y
    }

    /// Center Y at which a body moving from `current_y` to `new_y` at `x`
    /// comes to rest, if any surface is crossed this step.
    ///
    /// The floor always wins once crossed. Otherwise the highest obstacle top
    /// that the bottom edge passes through is chosen; on an exact tie the
    /// first registered obstacle wins. Single-step sweep only, so a fall that
    /// skips a whole platform in one tick is not caught.
    pub fn find_landing(&self, x: f32, current_y: f32, new_y: f32) -> Option<f32> {
        let half_height = self.half_extents.y;
        let new_bottom = new_y - half_height;
        if new_bottom <= self.arena.bottom {
            return Some(self.floor_y());
        }

        let current_bottom = current_y - half_height;
        let (left, right) = self.horizontal_span(x);
        let mut highest_top: Option<f32> = None;
        for obstacle in self.obstacles.current_obstacles().flatten() {
            let was_above = current_bottom >= obstacle.top;
            let crosses = new_bottom <= obstacle.top;
            if !(obstacle.overlaps_x(left, right) && was_above && crosses) {
                continue;
            }
            match highest_top {
                Some(top) if obstacle.top <= top => {}
                _ => highest_top = Some(obstacle.top),
            }
        }

        highest_top.map(|top| top + half_height)
    }

    /// Whether a body centered at `(x, y)` rests on the floor or on an obstacle top.
    pub fn is_supported(&self, x: f32, y: f32) -> bool {
        let bottom = y - self.half_extents.y;
        if bottom <= self.arena.bottom + self.tolerance {
            return true;
        }

        let (left, right) = self.horizontal_span(x);
        self.obstacles
            .current_obstacles()
            .flatten()
            .any(|obstacle| {
                obstacle.overlaps_x(left, right)
                    && (bottom - obstacle.top).abs() <= self.tolerance
            })
    }

    fn horizontal_span(&self, x: f32) -> (f32, f32) {
        (x - self.half_extents.x, x + self.half_extents.x)
    }
}
