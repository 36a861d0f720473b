use super::coords::{GridPosition, MapDimensions, ScreenPosition};
use super::transform::TileMetrics;

/// Grid cell under the pointer. Always inside the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub grid_x: i32,
    pub grid_y: i32,
}

impl SelectionState {
    pub fn at_level(&self, level: i32) -> GridPosition {
        GridPosition::new(self.grid_x, self.grid_y, level)
    }

    pub fn matches(&self, pos: GridPosition) -> bool {
        self.grid_x == pos.x && self.grid_y == pos.y
    }
}

/// Inverts the isometric projection for a pointer in logical viewport
/// pixels. `(0, 0)` means the pointer left the window and yields `None`.
///
/// The arithmetic runs in a fixed order with truncating division; cells at
/// tile edges depend on it.
pub fn pointer_to_cell(
    pointer: ScreenPosition,
    camera_offset: ScreenPosition,
    active_level: i32,
    metrics: TileMetrics,
    dimensions: MapDimensions,
) -> Option<SelectionState> {
    let mx = pointer.x;
    let mut my = pointer.y;
    if mx == 0 && my == 0 {
        return None;
    }

    let h = metrics.tile_height();
    my += -h + (active_level + 1) * (h / 2);

    let mut sx = mx - camera_offset.x - 2 * my + 2 * camera_offset.y;
    let mut sy = my - camera_offset.y + sx / 4;
    sy /= metrics.quarter_width();
    sx /= metrics.tile_width();

    Some(SelectionState {
        grid_x: sy.clamp(0, dimensions.width - 1),
        grid_y: sx.clamp(0, dimensions.length - 1),
    })
}

/// Pointer position in logical pixels: window pixels divided by the
/// window-to-viewport scale, truncated.
pub fn scale_pointer(x: f64, y: f64, scale_x: f64, scale_y: f64) -> ScreenPosition {
    ScreenPosition::new((x / scale_x) as i32, (y / scale_y) as i32)
}
