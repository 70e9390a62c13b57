use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::geometry::Vec2;

use super::input::ActionStates;
use super::scene::SceneHost;
use super::{InputAction, InputSnapshot, Renderer, Scene, SceneCommand};

pub const SLOW_FRAME_ENV_VAR: &str = "BUDDY_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Buddy".to_string(),
            window_width: 800,
            window_height: 450,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            simulated_slow_frame_ms: 0,
            max_render_fps: Some(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let mut host = SceneHost::new(scene);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let initial_size = window.inner_size();
    let mut input_collector = InputCollector::new(initial_size.width, initial_size.height);
    host.load();
    info!(
        panel_count = host.world().panels().len(),
        "scene_loaded"
    );

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.set_cursor_position_px(position.x as f32, position.y as f32);
                }
                WindowEvent::CursorLeft { .. } => {
                    input_collector.clear_cursor_position();
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::Focused(false) => {
                    // Key releases are not delivered while unfocused.
                    input_collector.release_all_keys();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if !event.repeat {
                        input_collector.handle_physical_key(event.physical_key, event.state);
                    }
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        if host.update(fixed_dt_seconds, &input_snapshot) == SceneCommand::Quit {
                            info!(reason = "scene_command", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    if let Err(error) = renderer.render_world(host.world()) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = host.debug_title();
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => window.set_title(title),
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                host.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    actions_down: ActionStates,
    actions_pressed: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_mouse_is_down: bool,
    left_click_pressed_edge: bool,
    left_click_released_edge: bool,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        let Some(action) = action_for_key(key) else {
            return;
        };
        self.handle_action_state(action, state);
        if action == InputAction::Quit && state == ElementState::Pressed {
            self.mark_quit_requested();
        }
    }

    fn handle_action_state(&mut self, action: InputAction, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.actions_down.is_down(action) {
                    self.actions_pressed.set(action, true);
                }
                self.actions_down.set(action, true);
            }
            ElementState::Released => self.actions_down.set(action, false),
        }
    }

    fn release_all_keys(&mut self) {
        self.actions_down.clear();
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.actions_down,
            self.actions_pressed,
            self.cursor_position_px,
            self.left_mouse_is_down,
            self.left_click_pressed_edge,
            self.left_click_released_edge,
            self.window_width,
            self.window_height,
        );
        self.actions_pressed.clear();
        self.left_click_pressed_edge = false;
        self.left_click_released_edge = false;
        snapshot
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn set_cursor_position_px(&mut self, x: f32, y: f32) {
        self.cursor_position_px = Some(Vec2 { x, y });
    }

    fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                if !self.left_mouse_is_down {
                    self.left_click_pressed_edge = true;
                }
                self.left_mouse_is_down = true;
            }
            ElementState::Released => {
                if self.left_mouse_is_down {
                    self.left_click_released_edge = true;
                }
                self.left_mouse_is_down = false;
            }
        }
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    match key {
        PhysicalKey::Code(KeyCode::KeyW) => Some(InputAction::ToggleWander),
        PhysicalKey::Code(KeyCode::Tab) => Some(InputAction::CyclePage),
        PhysicalKey::Code(KeyCode::Escape) => Some(InputAction::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => parse_slow_frame_ms(&value)
            .map(Duration::from_millis)
            .unwrap_or_else(|| {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }),
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

fn parse_slow_frame_ms(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}
