use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowBuilder;

use crate::map::{MapTimings, MapView, PointerButtons, PointerEvent, Viewport};
use crate::world::Battlefield;

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::rendering::{Renderer, SpriteBank};
use super::{InputAction, InputSnapshot, Scene, SceneCommand};

pub const SLOW_FRAME_ENV_VAR: &str = "BATTLESCAPE_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    /// Size of the pixel buffer the map is composed into.
    pub logical_viewport: Viewport,
    /// Initial window size as a multiple of the logical viewport.
    pub window_scale: u32,
    pub timings: MapTimings,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Battlescape".to_string(),
            logical_viewport: Viewport::new(320, 200),
            window_scale: 3,
            timings: MapTimings::default(),
            target_tps: 100,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 10,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: Some(120),
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

pub fn run_app(
    config: LoopConfig,
    mut battlefield: Battlefield,
    sprites: SpriteBank,
    mut scene: Box<dyn Scene>,
) -> Result<(), AppError> {
    let logical = config.logical_viewport;
    let mut view = MapView::new(
        battlefield.dimensions(),
        sprites.metrics(),
        logical,
        config.timings,
    );
    scene.load(&mut view, &mut battlefield);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window_scale = config.window_scale.max(1) as f64;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                logical.width as f64 * window_scale,
                logical.height as f64 * window_scale,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window), logical).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);

    info!(
        width = battlefield.dimensions().width,
        length = battlefield.dimensions().length,
        height = battlefield.dimensions().height,
        units = battlefield.units().len(),
        "battlefield_loaded"
    );
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        logical_width = logical.width,
        logical_height = logical.height,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut input_collector = InputCollector::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let mut cursor_visible = true;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.set_cursor_position_px(position.x, position.y);
                    let event = pointer_event(
                        (position.x, position.y),
                        renderer.pointer_scale(),
                        input_collector.buttons(),
                    );
                    view.pointer_moved(&event);
                }
                WindowEvent::CursorLeft { .. } => {
                    input_collector.clear_cursor_position();
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                    if button == MouseButton::Right {
                        match (state, input_collector.cursor_position_px) {
                            (ElementState::Pressed, Some((x, y))) => view.right_pressed(x, y),
                            (ElementState::Released, _) => view.right_released(),
                            _ => {}
                        }
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        // Debug perturbation only.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    accumulator =
                        accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    let mut needs_redraw = false;
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        if scene.update(&input_snapshot, &mut view, &mut battlefield)
                            == SceneCommand::Quit
                        {
                            info!(reason = "scene_quit", "shutdown_requested");
                            window_target.exit();
                            return;
                        }
                        let fired = view.think(fixed_dt, &mut battlefield);
                        needs_redraw |= !fired.is_empty();
                        metrics_accumulator.record_tick();
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

                    needs_redraw |= view.take_redraw_request();
                    if needs_redraw {
                        renderer.compose(&mut view, &battlefield, &sprites);
                        metrics_accumulator.record_redraw();
                    }
                    if let Err(error) = renderer.present() {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let want_visible = !view.cursor_hidden();
                    if want_visible != cursor_visible {
                        window.set_cursor_visible(want_visible);
                        cursor_visible = want_visible;
                        debug!(cursor_visible, "cursor_visibility_changed");
                    }

                    let next_title = scene.debug_title(&view, &battlefield);
                    if next_title != last_applied_title {
                        window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                        last_applied_title = next_title;
                    }
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            redraws_per_sec = snapshot.redraws_per_sec,
                            frame_time_ms = snapshot.frame_time_ms,
                            level = view.camera().active_level(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    cursor_position_px: Option<(f64, f64)>,
    left_mouse_is_down: bool,
    left_click_pressed_edge: bool,
    right_mouse_is_down: bool,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &winit::event::KeyEvent) {
        let PhysicalKey::Code(code) = key_event.physical_key else {
            return;
        };
        let Some(action) = InputAction::from_key(code) else {
            return;
        };
        let is_pressed = key_event.state == ElementState::Pressed;
        self.action_states.set(action, is_pressed);
        if action == InputAction::Quit && is_pressed {
            self.quit_requested = true;
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.left_click_pressed_edge,
        );
        self.action_states.clear_edges();
        self.left_click_pressed_edge = false;
        snapshot
    }

    fn buttons(&self) -> PointerButtons {
        PointerButtons {
            left: self.left_mouse_is_down,
            right: self.right_mouse_is_down,
        }
    }

    fn set_cursor_position_px(&mut self, x: f64, y: f64) {
        self.cursor_position_px = Some((x, y));
    }

    fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        let is_pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => {
                if is_pressed && !self.left_mouse_is_down {
                    self.left_click_pressed_edge = true;
                }
                self.left_mouse_is_down = is_pressed;
            }
            MouseButton::Right => self.right_mouse_is_down = is_pressed,
            _ => {}
        }
    }
}

fn pointer_event(position: (f64, f64), scale: (f64, f64), buttons: PointerButtons) -> PointerEvent {
    PointerEvent {
        x: position.0,
        y: position.1,
        scale_x: scale.0,
        scale_y: scale.1,
        buttons,
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
        Ok(value) => parse_slow_frame_ms(&value).unwrap_or_else(|| {
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

fn parse_slow_frame_ms(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use winit::keyboard::KeyCode;

    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(35), Duration::from_millis(10), 10);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(5));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn left_click_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::default();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let first = input.snapshot_for_tick();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let second = input.snapshot_for_tick();
        assert!(first.left_click_pressed());
        assert!(!second.left_click_pressed());

        input.handle_mouse_input(MouseButton::Left, ElementState::Released);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        assert!(input.snapshot_for_tick().left_click_pressed());
    }

    #[test]
    fn action_edges_are_consumed_by_the_snapshot() {
        let mut input = InputCollector::default();
        input.action_states.set(InputAction::LevelUp, true);
        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();
        assert!(first.was_pressed(InputAction::LevelUp));
        assert!(!second.was_pressed(InputAction::LevelUp));
        assert!(second.is_down(InputAction::LevelUp));
    }

    #[test]
    fn pointer_buttons_follow_mouse_state() {
        let mut input = InputCollector::default();
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        assert_eq!(
            input.buttons(),
            PointerButtons {
                left: false,
                right: true
            }
        );
        input.handle_mouse_input(MouseButton::Right, ElementState::Released);
        assert_eq!(input.buttons(), PointerButtons::default());
    }

    #[test]
    fn pointer_event_carries_scale_and_buttons() {
        let event = pointer_event((30.0, 12.0), (2.0, 3.0), PointerButtons::default());
        assert_eq!(event.x, 30.0);
        assert_eq!(event.scale_x, 2.0);
        assert_eq!(event.scale_y, 3.0);
        assert!(!event.buttons.right);
    }

    #[test]
    fn escape_maps_to_quit_action() {
        assert_eq!(InputAction::from_key(KeyCode::Escape), Some(InputAction::Quit));
    }

    #[test]
    fn zero_render_cap_disables_sleep() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(1), target_frame_duration(None)),
            Duration::ZERO
        );
    }

    #[test]
    fn render_cap_sleeps_for_the_remaining_frame_time() {
        let target = target_frame_duration(Some(100));
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(4), target),
            Duration::from_millis(6)
        );
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(12), target),
            Duration::ZERO
        );
        assert_eq!(format_render_cap(Some(100)), "100");
    }

    #[test]
    fn slow_frame_values_parse_as_milliseconds() {
        assert_eq!(parse_slow_frame_ms(" 40 "), Some(Duration::from_millis(40)));
        assert_eq!(parse_slow_frame_ms("fast"), None);
    }
}
