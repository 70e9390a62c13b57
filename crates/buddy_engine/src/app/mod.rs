mod input;
mod loop_runner;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use rendering::{arena_to_screen, screen_to_arena, Renderer, Viewport};
pub use scene::{BuddyVisual, InputSnapshot, PanelVisual, Scene, SceneCommand, SceneWorld};
