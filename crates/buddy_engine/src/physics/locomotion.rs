use tracing::{debug, trace};

use crate::geometry::{Rect, Vec2};

use super::config::BuddyConfig;
use super::obstacles::ObstacleRegistry;
use super::planner::{move_direction, wander_range, WanderPlanner};
use super::squish::SquishAnimator;
use super::support::SupportResolver;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocomotionState {
    /// Grounded and idle. The timer counts down to the next target pick;
    /// `None` parks Buddy until wandering is (re)enabled.
    Waiting { wait_remaining: Option<f32> },
    /// Grounded and walking toward `target` on the ground line.
    Wandering { target: Vec2 },
    Falling,
    /// Position follows the pointer; no physics runs.
    Dragged,
}

impl LocomotionState {
    pub fn is_grounded(&self) -> bool {
        matches!(self, Self::Waiting { .. } | Self::Wandering { .. })
    }

    pub fn target(&self) -> Option<Vec2> {
        match self {
            Self::Wandering { target } => Some(*target),
            _ => None,
        }
    }
}

/// The companion body: owns position, vertical velocity and locomotion state,
/// and advances them once per [`Buddy::tick`].
#[derive(Debug, Clone)]
pub struct Buddy {
    config: BuddyConfig,
    arena: Rect,
    half_extents: Vec2,
    position: Vec2,
    velocity_y: f32,
    ground_y: f32,
    state: LocomotionState,
    can_wander: bool,
    planner: WanderPlanner,
    squish: SquishAnimator,
}

impl Buddy {
    /// Grounded at `spawn`. Requests a first target right away when wandering is enabled.
    pub fn new(config: BuddyConfig, arena: Rect, half_extents: Vec2, spawn: Vec2) -> Self {
        Self::with_planner(
            config,
            arena,
            half_extents,
            spawn,
            WanderPlanner::from_entropy(),
        )
    }

    pub fn with_seed(
        config: BuddyConfig,
        arena: Rect,
        half_extents: Vec2,
        spawn: Vec2,
        seed: u64,
    ) -> Self {
        Self::with_planner(
            config,
            arena,
            half_extents,
            spawn,
            WanderPlanner::with_seed(seed),
        )
    }

    fn with_planner(
        config: BuddyConfig,
        arena: Rect,
        half_extents: Vec2,
        spawn: Vec2,
        planner: WanderPlanner,
    ) -> Self {
        let squish = SquishAnimator::new(
            config.squish_stretch,
            config.squish_compress,
            config.squish_recovery_seconds,
        );
        let mut buddy = Self {
            can_wander: config.can_wander,
            config,
            arena,
            half_extents,
            position: spawn,
            velocity_y: 0.0,
            ground_y: spawn.y,
            state: LocomotionState::Waiting {
                wait_remaining: None,
            },
            planner,
            squish,
        };
        buddy.position.x = buddy.clamp_x(spawn.x);
        if buddy.can_wander {
            buddy.request_target();
        }
        buddy
    }

    /// Advances the simulation by `dt` seconds. Non-positive or non-finite
    /// steps are ignored.
    pub fn tick(&mut self, dt: f32, obstacles: &ObstacleRegistry) {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }

        let resolver = self.resolver(obstacles);
        match self.state {
            LocomotionState::Dragged => {}
            LocomotionState::Falling => self.tick_falling(dt, &resolver),
            LocomotionState::Waiting { wait_remaining } => self.tick_waiting(dt, wait_remaining),
            LocomotionState::Wandering { target } => self.tick_wandering(dt, target, &resolver),
        }
    }

    fn resolver<'a>(&self, obstacles: &'a ObstacleRegistry) -> SupportResolver<'a> {
        SupportResolver::new(
            self.arena,
            self.half_extents,
            self.config.support_tolerance,
            obstacles,
        )
    }

    fn tick_falling(&mut self, dt: f32, resolver: &SupportResolver<'_>) {
        self.velocity_y -= self.config.gravity * dt;
        let new_y = self.position.y + self.velocity_y * dt;

        match resolver.find_landing(self.position.x, self.position.y, new_y) {
            Some(landing_y) => {
                debug!(
                    x = self.position.x,
                    landing_y,
                    impact_velocity = self.velocity_y,
                    "buddy_landed"
                );
                self.position.y = landing_y;
                self.ground_y = landing_y;
                self.velocity_y = 0.0;
                self.state = LocomotionState::Waiting {
                    wait_remaining: None,
                };
                if self.can_wander {
                    self.request_target();
                }
            }
            None => {
                trace!(y = new_y, velocity_y = self.velocity_y, "buddy_falling");
                self.position.y = new_y;
            }
        }
    }

    fn tick_waiting(&mut self, dt: f32, wait_remaining: Option<f32>) {
        if !self.can_wander {
            return;
        }
        let Some(remaining) = wait_remaining else {
            return;
        };

        let remaining = remaining - dt;
        if remaining <= 0.0 {
            self.request_target();
        } else {
            self.state = LocomotionState::Waiting {
                wait_remaining: Some(remaining),
            };
        }
    }

    fn tick_wandering(&mut self, dt: f32, target: Vec2, resolver: &SupportResolver<'_>) {
        if !self.can_wander {
            return;
        }

        self.squish.tick(dt);
        let next = self
            .position
            .move_towards(target, self.config.wander_speed * dt);
        self.position = next;

        if !resolver.is_supported(next.x, next.y) {
            debug!(x = next.x, y = next.y, "buddy_walked_off_edge");
            self.squish.reset();
            self.velocity_y = 0.0;
            self.state = LocomotionState::Falling;
            return;
        }

        if next.distance(target) < self.config.target_reached_threshold {
            self.squish.reset();
            let wait = self
                .planner
                .sample_wait(self.config.min_wait_seconds, self.config.max_wait_seconds);
            trace!(x = next.x, wait_seconds = wait, "wander_target_reached");
            self.state = LocomotionState::Waiting {
                wait_remaining: Some(wait),
            };
        }
    }

    fn request_target(&mut self) {
        match self
            .planner
            .pick_target(self.arena, self.half_extents, self.position, self.ground_y)
        {
            Some(target) => {
                trace!(
                    target_x = target.position.x,
                    ground_y = self.ground_y,
                    "wander_target_picked"
                );
                self.squish.start(target.direction);
                self.state = LocomotionState::Wandering {
                    target: target.position,
                };
            }
            None => {
                debug!(
                    arena_width = self.arena.width(),
                    body_width = self.half_extents.x * 2.0,
                    "wander_range_degenerate"
                );
                self.state = LocomotionState::Waiting {
                    wait_remaining: None,
                };
            }
        }
    }

    /// Walks toward `target_x` on the current ground line, clamped to the arena.
    /// Ignored unless grounded.
    #[cfg(test)]
    fn walk_to(&mut self, target_x: f32) {
        if !self.state.is_grounded() {
            return;
        }
        let target = Vec2::new(self.clamp_x(target_x), self.ground_y);
        self.squish.start(move_direction(self.position, target));
        self.state = LocomotionState::Wandering { target };
    }

    /// Places Buddy at `position` with zero velocity and lets gravity take over.
    pub fn drop_from(&mut self, position: Vec2) {
        self.position = Vec2::new(self.clamp_x(position.x), position.y);
        self.velocity_y = 0.0;
        self.squish.reset();
        self.state = LocomotionState::Falling;
    }

    pub fn drag_start(&mut self, pointer: Vec2) {
        debug!(x = pointer.x, y = pointer.y, "buddy_drag_started");
        self.squish.reset();
        self.velocity_y = 0.0;
        self.position = pointer;
        self.state = LocomotionState::Dragged;
    }

    pub fn drag_move(&mut self, pointer: Vec2) {
        if self.state != LocomotionState::Dragged {
            return;
        }
        self.position = pointer;
    }

    /// Releases the drag; Buddy falls from where it was dropped. A release
    /// outside the arena's horizontal range is pulled back inside first.
    pub fn drag_end(&mut self) {
        if self.state != LocomotionState::Dragged {
            return;
        }
        debug!(x = self.position.x, y = self.position.y, "buddy_drag_released");
        self.position.x = self.clamp_x(self.position.x);
        self.velocity_y = 0.0;
        self.state = LocomotionState::Falling;
    }

    /// Enables or freezes wandering. Disabling never forces a fall; enabling
    /// while parked picks a fresh target.
    pub fn set_can_wander(&mut self, can_wander: bool) {
        self.can_wander = can_wander;
        let parked = matches!(
            self.state,
            LocomotionState::Waiting {
                wait_remaining: None
            }
        );
        if can_wander && parked {
            self.request_target();
        }
    }

    /// Call after obstacles appear, vanish or move. A grounded body that
    /// lost its support starts falling; a supported one keeps its state,
    /// wait timer and target.
    pub fn obstacles_changed(&mut self, obstacles: &ObstacleRegistry) {
        if !self.state.is_grounded() {
            return;
        }
        let resolver = self.resolver(obstacles);
        if resolver.is_supported(self.position.x, self.position.y) {
            trace!(x = self.position.x, y = self.position.y, "buddy_footing_kept");
            return;
        }
        debug!(x = self.position.x, y = self.position.y, "buddy_lost_footing");
        self.squish.reset();
        self.velocity_y = 0.0;
        self.state = LocomotionState::Falling;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity_y(&self) -> f32 {
        self.velocity_y
    }

    pub fn ground_y(&self) -> f32 {
        self.ground_y
    }

    pub fn state(&self) -> LocomotionState {
        self.state
    }

    pub fn can_wander(&self) -> bool {
        self.can_wander
    }

    pub fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    pub fn arena(&self) -> Rect {
        self.arena
    }

    /// Visual scale from the squish effect; `(1, 1)` at rest.
    pub fn scale(&self) -> Vec2 {
        self.squish.scale()
    }

    /// Unscaled body rectangle, used for pointer hit tests.
    pub fn body_rect(&self) -> Rect {
        Rect::from_center_half_extents(self.position, self.half_extents)
    }

    fn clamp_x(&self, x: f32) -> f32 {
        match wander_range(self.arena, self.half_extents.x) {
            Some((min_x, max_x)) => x.clamp(min_x, max_x),
            None => self.arena.center().x,
        }
    }
}
