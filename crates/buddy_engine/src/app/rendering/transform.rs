use crate::geometry::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Uniform arena-to-pixel scale and letterbox offsets for a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ArenaFit {
    pixels_per_unit: f32,
    offset_x: f32,
    offset_y: f32,
}

fn fit_arena(arena: Rect, viewport: Viewport) -> Option<ArenaFit> {
    let width = arena.width();
    let height = arena.height();
    if width <= 0.0 || height <= 0.0 || viewport.width == 0 || viewport.height == 0 {
        return None;
    }
    let viewport_w = viewport.width as f32;
    let viewport_h = viewport.height as f32;
    let pixels_per_unit = (viewport_w / width).min(viewport_h / height);
    Some(ArenaFit {
        pixels_per_unit,
        offset_x: (viewport_w - width * pixels_per_unit) * 0.5,
        offset_y: (viewport_h - height * pixels_per_unit) * 0.5,
    })
}

/// Arena point (y up) to window pixels (y down), letterboxed to keep the
/// arena's aspect ratio.
pub fn arena_to_screen(point: Vec2, arena: Rect, viewport: Viewport) -> Option<Vec2> {
    let fit = fit_arena(arena, viewport)?;
    Some(Vec2::new(
        fit.offset_x + (point.x - arena.left) * fit.pixels_per_unit,
        fit.offset_y + (arena.top - point.y) * fit.pixels_per_unit,
    ))
}

pub fn screen_to_arena(screen_px: Vec2, arena: Rect, viewport: Viewport) -> Option<Vec2> {
    let fit = fit_arena(arena, viewport)?;
    Some(Vec2::new(
        arena.left + (screen_px.x - fit.offset_x) / fit.pixels_per_unit,
        arena.top - (screen_px.y - fit.offset_y) / fit.pixels_per_unit,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARENA: Rect = Rect::new(0.0, 100.0, 0.0, 50.0);

    fn approx_eq(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 0.0001 && (a.y - b.y).abs() < 0.0001
    }

    #[test]
    fn arena_corners_fill_matching_viewport() {
        let viewport = Viewport {
            width: 200,
            height: 100,
        };
        let top_left = arena_to_screen(Vec2::new(0.0, 50.0), ARENA, viewport).expect("fit");
        let bottom_right = arena_to_screen(Vec2::new(100.0, 0.0), ARENA, viewport).expect("fit");
        assert!(approx_eq(top_left, Vec2::new(0.0, 0.0)));
        assert!(approx_eq(bottom_right, Vec2::new(200.0, 100.0)));
    }

    #[test]
    fn taller_viewport_letterboxes_vertically() {
        let viewport = Viewport {
            width: 200,
            height: 300,
        };
        // Scale 2, arena is 100 px tall, centered with 100 px bars.
        let floor_left = arena_to_screen(Vec2::new(0.0, 0.0), ARENA, viewport).expect("fit");
        assert!(approx_eq(floor_left, Vec2::new(0.0, 200.0)));
    }

    #[test]
    fn screen_to_arena_inverts_mapping() {
        let viewport = Viewport {
            width: 640,
            height: 480,
        };
        let point = Vec2::new(37.5, 12.25);
        let screen = arena_to_screen(point, ARENA, viewport).expect("fit");
        let back = screen_to_arena(screen, ARENA, viewport).expect("fit");
        assert!(approx_eq(back, point));
    }

    #[test]
    fn empty_viewport_has_no_mapping() {
        let viewport = Viewport {
            width: 0,
            height: 480,
        };
        assert_eq!(arena_to_screen(Vec2::ZERO, ARENA, viewport), None);
        assert_eq!(screen_to_arena(Vec2::ZERO, ARENA, viewport), None);
    }
}
