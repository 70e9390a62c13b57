use super::input::{ActionStates, InputAction};
use crate::geometry::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Input state for one simulation tick. Press and release flags are edges:
/// they are set for exactly one tick per physical press.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions_down: ActionStates,
    actions_pressed: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_mouse_down: bool,
    left_click_pressed: bool,
    left_click_released: bool,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        actions_down: ActionStates,
        actions_pressed: ActionStates,
        cursor_position_px: Option<Vec2>,
        left_mouse_down: bool,
        left_click_pressed: bool,
        left_click_released: bool,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions_down,
            actions_pressed,
            cursor_position_px,
            left_mouse_down,
            left_click_pressed,
            left_click_released,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions_down.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions_pressed.is_down(action)
    }

    /// Window-pixel cursor position, `y` growing downward. `None` while the
    /// cursor is outside the window.
    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn left_mouse_down(&self) -> bool {
        self.left_mouse_down
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn left_click_released(&self) -> bool {
        self.left_click_released
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions_pressed.set(action, true);
        self.actions_down.set(action, true);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        if left_click_pressed {
            self.left_mouse_down = true;
        }
        self
    }

    pub fn with_left_mouse_down(mut self, left_mouse_down: bool) -> Self {
        self.left_mouse_down = left_mouse_down;
        self
    }

    pub fn with_left_click_released(mut self, left_click_released: bool) -> Self {
        self.left_click_released = left_click_released;
        if left_click_released {
            self.left_mouse_down = false;
        }
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelVisual {
    pub name: String,
    pub bounds: Rect,
    pub collidable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuddyVisual {
    /// Unscaled body rectangle.
    pub body: Rect,
    pub scale: Vec2,
    pub dragged: bool,
}

/// What the renderer draws. Scenes rewrite it every tick; the renderer never
/// reaches back into scene state.
#[derive(Debug, Clone, Default)]
pub struct SceneWorld {
    arena: Rect,
    panels: Vec<PanelVisual>,
    buddy: Option<BuddyVisual>,
}

impl SceneWorld {
    pub fn arena(&self) -> Rect {
        self.arena
    }

    pub fn set_arena(&mut self, arena: Rect) {
        self.arena = arena;
    }

    pub fn panels(&self) -> &[PanelVisual] {
        &self.panels
    }

    pub fn set_panels(&mut self, panels: Vec<PanelVisual>) {
        self.panels = panels;
    }

    pub fn buddy(&self) -> Option<&BuddyVisual> {
        self.buddy.as_ref()
    }

    pub fn set_buddy(&mut self, buddy: Option<BuddyVisual>) {
        self.buddy = buddy;
    }

    pub fn clear(&mut self) {
        self.panels.clear();
        self.buddy = None;
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

/// Owns the running scene and its world, and guards load/unload ordering.
pub(crate) struct SceneHost {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneHost {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if !self.is_loaded {
            return SceneCommand::None;
        }
        self.scene.update(fixed_dt_seconds, input, &mut self.world)
    }

    pub(crate) fn shutdown(&mut self) {
        if !self.is_loaded {
            return;
        }
        self.scene.unload(&mut self.world);
        self.world.clear();
        self.is_loaded = false;
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Calls {
        loads: u32,
        updates: u32,
        unloads: u32,
    }

    struct CountingScene {
        calls: Rc<RefCell<Calls>>,
    }

    impl Scene for CountingScene {
        fn load(&mut self, world: &mut SceneWorld) {
            self.calls.borrow_mut().loads += 1;
            world.set_arena(Rect::new(0.0, 10.0, 0.0, 10.0));
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            input: &InputSnapshot,
            world: &mut SceneWorld,
        ) -> SceneCommand {
            self.calls.borrow_mut().updates += 1;
            world.set_buddy(Some(BuddyVisual {
                body: Rect::new(1.0, 2.0, 0.0, 1.0),
                scale: Vec2::ONE,
                dragged: false,
            }));
            if input.was_pressed(InputAction::Quit) {
                SceneCommand::Quit
            } else {
                SceneCommand::None
            }
        }

        fn unload(&mut self, _world: &mut SceneWorld) {
            self.calls.borrow_mut().unloads += 1;
        }
    }

    fn host() -> (SceneHost, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let scene = CountingScene {
            calls: Rc::clone(&calls),
        };
        (SceneHost::new(Box::new(scene)), calls)
    }

    #[test]
    fn load_runs_once() {
        let (mut host, calls) = host();
        host.load();
        host.load();
        assert_eq!(calls.borrow().loads, 1);
        assert_eq!(host.world().arena(), Rect::new(0.0, 10.0, 0.0, 10.0));
    }

    #[test]
    fn update_before_load_is_ignored() {
        let (mut host, calls) = host();
        assert_eq!(
            host.update(0.016, &InputSnapshot::empty()),
            SceneCommand::None
        );
        assert_eq!(calls.borrow().updates, 0);
    }

    #[test]
    fn update_forwards_scene_command() {
        let (mut host, _calls) = host();
        host.load();
        let input = InputSnapshot::empty().with_action_pressed(InputAction::Quit);
        assert_eq!(host.update(0.016, &input), SceneCommand::Quit);
        assert!(host.world().buddy().is_some());
    }

    #[test]
    fn shutdown_unloads_and_clears_world() {
        let (mut host, calls) = host();
        host.load();
        host.update(0.016, &InputSnapshot::empty());
        host.shutdown();
        host.shutdown();
        assert_eq!(calls.borrow().unloads, 1);
        assert!(host.world().buddy().is_none());
    }

    #[test]
    fn click_builders_keep_button_state_consistent() {
        let pressed = InputSnapshot::empty().with_left_click_pressed(true);
        assert!(pressed.left_mouse_down());
        let released = pressed.with_left_click_released(true);
        assert!(!released.left_mouse_down());
        assert!(released.left_click_released());
    }
}
