//! Buddy's locomotion: gravity, landing on UI obstacles, wandering and drag.
//!
//! Everything here is single-threaded and advanced by an explicit
//! [`Buddy::tick`]; the host loop decides the cadence.

mod config;
mod locomotion;
mod obstacles;
mod planner;
mod squish;
mod support;

pub use config::{BuddyConfig, ConfigError};
pub use locomotion::{Buddy, LocomotionState};
pub use obstacles::{Collidable, ObstacleProvider, ObstacleRegistry};
pub use planner::{move_direction, wander_range, WanderPlanner, WanderTarget};
pub use squish::SquishAnimator;
pub use support::SupportResolver;
