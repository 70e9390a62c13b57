mod renderer;
mod transform;

pub use renderer::Renderer;
pub use transform::{arena_to_screen, screen_to_arena, Viewport};
