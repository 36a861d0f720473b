use thiserror::Error;

use super::coords::{GridPosition, ScreenPosition};

/// Pixel size of one tile sprite. Every projection constant derives from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMetrics {
    tile_width: i32,
    tile_height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileMetricsError {
    #[error("tile sprite is {width}x{height}px; width must be >= 4 and height >= 2")]
    TooSmall { width: u32, height: u32 },
}

impl TileMetrics {
    pub fn new(width: u32, height: u32) -> Result<Self, TileMetricsError> {
        // width / 4 and height / 2 are used as divisors and steps.
        if width < 4 || height < 2 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(TileMetricsError::TooSmall { width, height });
        }
        Ok(Self {
            tile_width: width as i32,
            tile_height: height as i32,
        })
    }

    pub fn tile_width(&self) -> i32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> i32 {
        self.tile_height
    }

    pub fn half_width(&self) -> i32 {
        self.tile_width / 2
    }

    pub fn quarter_width(&self) -> i32 {
        self.tile_width / 4
    }

    /// Vertical screen distance between two stacked levels.
    pub fn level_step(&self) -> i32 {
        (self.tile_height + self.tile_width / 4) / 2
    }
}

/// Forward isometric projection of a grid cell to the top-left corner of its
/// sprite, before the camera offset is applied. Off-map input is allowed.
pub fn to_screen(grid: GridPosition, metrics: TileMetrics) -> ScreenPosition {
    ScreenPosition {
        x: grid.x * metrics.half_width() + grid.y * metrics.half_width(),
        y: grid.x * metrics.quarter_width()
            - grid.y * metrics.quarter_width()
            - grid.z * metrics.level_step(),
    }
}
