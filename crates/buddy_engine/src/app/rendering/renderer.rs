use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{BuddyVisual, SceneWorld};
use crate::geometry::{Rect, Vec2};

use super::{arena_to_screen, Viewport};

const LETTERBOX_COLOR: [u8; 4] = [12, 13, 17, 255];
const ARENA_COLOR: [u8; 4] = [28, 31, 40, 255];
const FLOOR_COLOR: [u8; 4] = [90, 96, 112, 255];
const PANEL_COLOR: [u8; 4] = [48, 54, 68, 255];
const PANEL_OUTLINE_COLOR: [u8; 4] = [70, 78, 96, 255];
const COLLIDABLE_OUTLINE_COLOR: [u8; 4] = [120, 200, 150, 255];
const BUDDY_COLOR: [u8; 4] = [250, 196, 92, 255];
const BUDDY_DRAGGED_COLOR: [u8; 4] = [255, 150, 110, 255];
const BUDDY_EYE_COLOR: [u8; 4] = [30, 24, 20, 255];
const FLOOR_THICKNESS_PX: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRectPx {
    left: i32,
    right: i32,
    top: i32,
    bottom: i32,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render_world(&mut self, world: &SceneWorld) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        let viewport = self.viewport;
        draw_world(self.pixels.frame_mut(), viewport, world);
        self.pixels.render()
    }
}

fn draw_world(frame: &mut [u8], viewport: Viewport, world: &SceneWorld) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&LETTERBOX_COLOR);
    }

    let arena = world.arena();
    let Some(arena_px) = rect_to_screen(arena, arena, viewport) else {
        return;
    };
    fill_rect(frame, viewport, arena_px, ARENA_COLOR);
    fill_rect(
        frame,
        viewport,
        ScreenRectPx {
            top: arena_px.bottom - FLOOR_THICKNESS_PX,
            ..arena_px
        },
        FLOOR_COLOR,
    );

    for panel in world.panels() {
        let Some(panel_px) = rect_to_screen(panel.bounds, arena, viewport) else {
            continue;
        };
        fill_rect(frame, viewport, panel_px, PANEL_COLOR);
        let outline = if panel.collidable {
            COLLIDABLE_OUTLINE_COLOR
        } else {
            PANEL_OUTLINE_COLOR
        };
        draw_rect_outline(frame, viewport, panel_px, outline);
    }

    if let Some(buddy) = world.buddy() {
        draw_buddy(frame, viewport, arena, buddy);
    }
}

fn draw_buddy(frame: &mut [u8], viewport: Viewport, arena: Rect, buddy: &BuddyVisual) {
    let body = squished_body(buddy.body, buddy.scale);
    let Some(body_px) = rect_to_screen(body, arena, viewport) else {
        return;
    };
    let color = if buddy.dragged {
        BUDDY_DRAGGED_COLOR
    } else {
        BUDDY_COLOR
    };
    fill_rect(frame, viewport, body_px, color);

    let eye_y = body_px.top + (body_px.bottom - body_px.top) / 3;
    let eye_half = ((body_px.right - body_px.left) / 12).max(1);
    let quarter = (body_px.right - body_px.left) / 4;
    draw_square(
        frame,
        viewport,
        body_px.left + quarter,
        eye_y,
        eye_half,
        BUDDY_EYE_COLOR,
    );
    draw_square(
        frame,
        viewport,
        body_px.right - quarter,
        eye_y,
        eye_half,
        BUDDY_EYE_COLOR,
    );
}

/// Scales the body around its bottom-center so squish never lifts Buddy off
/// the surface it stands on.
fn squished_body(body: Rect, scale: Vec2) -> Rect {
    let half_width = body.width() * 0.5 * scale.x;
    let center_x = body.center().x;
    Rect::new(
        center_x - half_width,
        center_x + half_width,
        body.bottom,
        body.bottom + body.height() * scale.y,
    )
}

fn rect_to_screen(rect: Rect, arena: Rect, viewport: Viewport) -> Option<ScreenRectPx> {
    let top_left = arena_to_screen(Vec2::new(rect.left, rect.top), arena, viewport)?;
    let bottom_right = arena_to_screen(Vec2::new(rect.right, rect.bottom), arena, viewport)?;
    Some(ScreenRectPx {
        left: top_left.x.round() as i32,
        right: bottom_right.x.round() as i32,
        top: top_left.y.round() as i32,
        bottom: bottom_right.y.round() as i32,
    })
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

/// Fills `[left, right) x [top, bottom)`, clipped to the viewport.
fn fill_rect(frame: &mut [u8], viewport: Viewport, rect: ScreenRectPx, color: [u8; 4]) {
    let left = rect.left.max(0);
    let right = rect.right.min(viewport.width as i32);
    let top = rect.top.max(0);
    let bottom = rect.bottom.min(viewport.height as i32);
    for y in top..bottom {
        for x in left..right {
            write_pixel_rgba_clipped(frame, viewport.width as usize, x, y, color);
        }
    }
}

fn draw_rect_outline(frame: &mut [u8], viewport: Viewport, rect: ScreenRectPx, color: [u8; 4]) {
    let width = viewport.width as usize;
    let right = rect.right - 1;
    let bottom = rect.bottom - 1;
    for x in rect.left..=right {
        write_pixel_rgba_clipped(frame, width, x, rect.top, color);
        write_pixel_rgba_clipped(frame, width, x, bottom, color);
    }
    for y in rect.top..=bottom {
        write_pixel_rgba_clipped(frame, width, rect.left, y, color);
        write_pixel_rgba_clipped(frame, width, right, y, color);
    }
}

fn draw_square(
    frame: &mut [u8],
    viewport: Viewport,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    fill_rect(
        frame,
        viewport,
        ScreenRectPx {
            left: cx - half_size,
            right: cx + half_size + 1,
            top: cy - half_size,
            bottom: cy + half_size + 1,
        },
        color,
    );
}
