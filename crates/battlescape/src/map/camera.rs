use tracing::debug;

use super::coords::{GridPosition, MapDimensions, ScreenPosition};
use super::culler::Viewport;
use super::transform::{to_screen, TileMetrics};

pub const SCROLL_AMOUNT: i32 = 8;
pub const SCROLL_BORDER: i32 = 5;
pub const INITIAL_OFFSET: ScreenPosition = ScreenPosition::new(-250, 250);

/// View offset and active level. Every mutation goes through
/// [`CameraState::clamp`] before the state can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraState {
    offset: ScreenPosition,
    active_level: i32,
}

/// Inclusive offset ranges keeping the map on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub max_level: i32,
}

impl CameraBounds {
    pub fn for_map(dimensions: MapDimensions, metrics: TileMetrics) -> Self {
        Self {
            min_x: -(dimensions.width - 1) * metrics.tile_width(),
            max_x: 0,
            min_y: -(dimensions.length - 1) * metrics.quarter_width(),
            max_y: dimensions.length * metrics.quarter_width(),
            max_level: dimensions.max_level(),
        }
    }
}

impl CameraState {
    pub fn new(bounds: CameraBounds) -> Self {
        let mut state = Self {
            offset: INITIAL_OFFSET,
            active_level: 0,
        };
        state.clamp(bounds);
        state
    }

    pub fn offset(&self) -> ScreenPosition {
        self.offset
    }

    pub fn active_level(&self) -> i32 {
        self.active_level
    }

    pub fn scroll_by(&mut self, delta: ScreenPosition, bounds: CameraBounds) {
        self.offset = self.offset + delta;
        self.clamp(bounds);
    }

    pub fn level_up(&mut self, bounds: CameraBounds) {
        self.change_level(1, bounds);
    }

    pub fn level_down(&mut self, bounds: CameraBounds) {
        self.change_level(-1, bounds);
    }

    fn change_level(&mut self, delta: i32, bounds: CameraBounds) {
        let before = self.active_level;
        self.active_level += delta;
        self.clamp(bounds);
        if self.active_level != before {
            debug!(level = self.active_level, "map_level_changed");
        }
    }

    /// Puts `pos` at the middle of the viewport and shows its level.
    pub fn center_on(
        &mut self,
        pos: GridPosition,
        viewport: Viewport,
        metrics: TileMetrics,
        bounds: CameraBounds,
    ) {
        let screen = to_screen(pos, metrics);
        self.offset = ScreenPosition::new(
            -(screen.x - viewport.width / 2),
            -(screen.y - viewport.height / 2),
        );
        self.active_level = pos.z;
        self.clamp(bounds);
    }

    fn clamp(&mut self, bounds: CameraBounds) {
        self.offset.x = self.offset.x.clamp(bounds.min_x, bounds.max_x);
        self.offset.y = self.offset.y.clamp(bounds.min_y, bounds.max_y);
        self.active_level = self.active_level.clamp(0, bounds.max_level);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerButtons {
    pub left: bool,
    pub right: bool,
}

/// A pointer move in window pixels. `scale_*` is window pixels per logical
/// viewport pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub buttons: PointerButtons,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollState {
    #[default]
    Idle,
    Scrolling,
}

/// Turns pointer movement into a per-tick scroll velocity. Edge scrolling
/// keeps its velocity until the pointer leaves the border; a right-button
/// drag produces one step per pointer move.
#[derive(Debug, Clone, Default)]
pub struct ScrollController {
    velocity: ScreenPosition,
    state: ScrollState,
    drag_anchor: Option<(f64, f64)>,
    dragging: bool,
}

impl ScrollController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn velocity(&self) -> ScreenPosition {
        self.velocity
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn right_pressed(&mut self, x: f64, y: f64) {
        self.drag_anchor = Some((x, y));
    }

    pub fn right_released(&mut self) {
        self.drag_anchor = None;
    }

    /// Updates velocity from a pointer move. Returns the new scroll state so
    /// the caller can start or stop the scroll trigger.
    pub fn pointer_moved(&mut self, event: &PointerEvent, viewport: Viewport) -> ScrollState {
        if event.buttons.right {
            if let Some((anchor_x, anchor_y)) = self.drag_anchor {
                self.dragging = true;
                self.velocity = ScreenPosition::new(
                    (-(anchor_x - event.x) * (event.scale_x * 2.0)) as i32,
                    (-(anchor_y - event.y) * (event.scale_y * 2.0)) as i32,
                );
            }
            self.drag_anchor = Some((event.x, event.y));
        } else {
            if let Some(velocity) = edge_velocity(event.x, viewport.width, event.scale_x) {
                self.velocity.x = velocity;
            }
            if let Some(velocity) = edge_velocity(event.y, viewport.height, event.scale_y) {
                self.velocity.y = velocity;
            }
        }
        self.refresh_state()
    }

    /// One scroll trigger step. Drag scrolls apply once, then stop.
    pub fn step(&mut self, camera: &mut CameraState, bounds: CameraBounds) {
        camera.scroll_by(self.velocity, bounds);
        if self.dragging {
            self.dragging = false;
            self.velocity = ScreenPosition::default();
            self.refresh_state();
        }
    }

    fn refresh_state(&mut self) -> ScrollState {
        self.state = if self.velocity == ScreenPosition::default() {
            ScrollState::Idle
        } else {
            ScrollState::Scrolling
        };
        self.state
    }
}

/// Edge-scroll velocity along one axis. `None` leaves the axis unchanged,
/// which only happens for a pointer exactly at 0.
fn edge_velocity(pos: f64, extent: i32, scale: f64) -> Option<i32> {
    if pos < f64::from(SCROLL_BORDER) && pos > 0.0 {
        Some(SCROLL_AMOUNT)
    } else if pos > f64::from(extent - SCROLL_BORDER) * scale {
        Some(-SCROLL_AMOUNT)
    } else if pos != 0.0 {
        Some(0)
    } else {
        None
    }
}
