use std::time::Duration;

use tracing::{debug, warn};

use crate::app::rendering::{SpriteBank, Surface};
use crate::world::{Battlefield, UnitStatus};

use super::camera::{CameraBounds, CameraState, PointerEvent, ScrollController, ScrollState};
use super::clock::{AnimationClock, MapTimings, TriggerKind};
use super::compositor::{Compositor, MapFrame};
use super::coords::{GridPosition, MapDimensions};
use super::culler::{Viewport, ViewportCuller};
use super::selection::{pointer_to_cell, scale_pointer, SelectionState};
use super::transform::TileMetrics;

const ANIMATION_FRAMES: u8 = 8;

/// The battlescape map widget: camera, cursor, animation state and the
/// triggers that drive them. The battlefield itself is passed in per call
/// and never retained.
#[derive(Debug)]
pub struct MapView {
    dimensions: MapDimensions,
    metrics: TileMetrics,
    viewport: Viewport,
    bounds: CameraBounds,
    camera: CameraState,
    scroll: ScrollController,
    selection: SelectionState,
    clock: AnimationClock,
    animation_frame: u8,
    cursor_hidden: bool,
    redraw_requested: bool,
    culler: ViewportCuller,
    compositor: Compositor,
}

impl MapView {
    pub fn new(
        dimensions: MapDimensions,
        metrics: TileMetrics,
        viewport: Viewport,
        timings: MapTimings,
    ) -> Self {
        let bounds = CameraBounds::for_map(dimensions, metrics);
        Self {
            dimensions,
            metrics,
            viewport,
            bounds,
            camera: CameraState::new(bounds),
            scroll: ScrollController::new(),
            selection: SelectionState::default(),
            clock: AnimationClock::new(timings),
            animation_frame: 0,
            cursor_hidden: false,
            redraw_requested: true,
            culler: ViewportCuller::new(),
            compositor: Compositor::new(),
        }
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn metrics(&self) -> TileMetrics {
        self.metrics
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    /// The selected cell on the active level.
    pub fn selected_cell(&self) -> GridPosition {
        self.selection.at_level(self.camera.active_level())
    }

    pub fn animation_frame(&self) -> u8 {
        self.animation_frame
    }

    pub fn cursor_hidden(&self) -> bool {
        self.cursor_hidden
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.scroll.state()
    }

    pub fn is_trigger_running(&self, kind: TriggerKind) -> bool {
        self.clock.is_running(kind)
    }

    /// Advances the map triggers by `dt` and runs whatever fired, in poll
    /// order. Returns the triggers that changed what is on screen; a
    /// non-empty result means the map needs recomposing.
    pub fn think(&mut self, dt: Duration, battlefield: &mut Battlefield) -> Vec<TriggerKind> {
        let fired = self.clock.advance(dt);
        fired
            .into_iter()
            .filter(|kind| self.fire(*kind, battlefield))
            .collect()
    }

    fn fire(&mut self, kind: TriggerKind, battlefield: &mut Battlefield) -> bool {
        match kind {
            TriggerKind::Scroll => {
                self.scroll_step();
                true
            }
            TriggerKind::TileAnimation => {
                self.animate();
                true
            }
            TriggerKind::Walk => {
                self.walk_step(battlefield);
                true
            }
            // No projectiles fly yet; nothing changes on screen.
            TriggerKind::Projectile => false,
        }
    }

    fn scroll_step(&mut self) {
        self.scroll.step(&mut self.camera, self.bounds);
        if self.scroll.state() == ScrollState::Idle {
            self.clock.set_running(TriggerKind::Scroll, false);
        }
    }

    fn animate(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % ANIMATION_FRAMES;
    }

    fn walk_step(&mut self, battlefield: &mut Battlefield) {
        let Some(id) = battlefield.selected_unit_id() else {
            return;
        };
        let dimensions = battlefield.dimensions();

        let status = match battlefield.unit_mut(id) {
            Some(unit) => {
                if unit.status() == UnitStatus::Walking {
                    unit.keep_walking();
                }
                unit.status()
            }
            None => return,
        };
        if status != UnitStatus::Standing {
            return;
        }

        let Some(mut position) = battlefield.unit(id).map(|unit| unit.position()) else {
            return;
        };
        let floorless = battlefield
            .tile(position)
            .is_some_and(|tile| tile.has_no_floor());
        if floorless && position.z > 0 {
            position = GridPosition::new(position.x, position.y, position.z - 1);
            if let Some(unit) = battlefield.unit_mut(id) {
                unit.set_position(position);
            }
            debug!(unit = id.0, z = position.z, "unit_fell");
        }

        let Some(direction) = battlefield.dequeue_next_direction() else {
            self.cursor_hidden = false;
            return;
        };
        let destination = position + direction.vector();
        if !dimensions.contains(destination) {
            battlefield.clear_path();
            warn!(
                unit = id.0,
                x = destination.x,
                y = destination.y,
                z = destination.z,
                "unit_path_leaves_map_dropped"
            );
            self.cursor_hidden = false;
            return;
        }
        if let Some(unit) = battlefield.unit_mut(id) {
            unit.start_walking(direction);
            self.cursor_hidden = true;
        }
    }

    /// Paints the visible part of the map onto `surface`.
    pub fn draw<S: Surface + ?Sized>(
        &mut self,
        battlefield: &Battlefield,
        sprites: &SpriteBank,
        surface: &mut S,
    ) {
        let cells = self.culler.cull(
            battlefield.dimensions(),
            self.camera.active_level(),
            self.camera.offset(),
            self.viewport,
            self.metrics,
        );
        let frame = MapFrame {
            battlefield,
            sprites,
            cells,
            selection: self.selection,
            active_level: self.camera.active_level(),
            animation_frame: self.animation_frame,
            cursor_hidden: self.cursor_hidden,
        };
        self.compositor.draw(surface, &frame);
    }

    /// Feeds a pointer move to the scroll controller and the selection
    /// tracker. Starts or stops the scroll trigger as needed.
    pub fn pointer_moved(&mut self, event: &PointerEvent) {
        let state = self.scroll.pointer_moved(event, self.viewport);
        self.clock
            .set_running(TriggerKind::Scroll, state == ScrollState::Scrolling);

        let pointer = scale_pointer(event.x, event.y, event.scale_x, event.scale_y);
        if let Some(selection) = pointer_to_cell(
            pointer,
            self.camera.offset(),
            self.camera.active_level(),
            self.metrics,
            self.dimensions,
        ) {
            if selection != self.selection {
                self.selection = selection;
                self.redraw_requested = true;
            }
        }
    }

    pub fn right_pressed(&mut self, x: f64, y: f64) {
        self.scroll.right_pressed(x, y);
    }

    pub fn right_released(&mut self) {
        self.scroll.right_released();
    }

    pub fn level_up(&mut self) {
        self.camera.level_up(self.bounds);
        self.redraw_requested = true;
    }

    pub fn level_down(&mut self) {
        self.camera.level_down(self.bounds);
        self.redraw_requested = true;
    }

    pub fn center_on(&mut self, pos: GridPosition) {
        self.camera
            .center_on(pos, self.viewport, self.metrics, self.bounds);
        self.redraw_requested = true;
    }

    /// Whether something outside the triggers changed the view since the
    /// last call.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }
}
